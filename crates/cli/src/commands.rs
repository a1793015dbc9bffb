//! `managerctl` subcommands, one per remote procedure.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Subcommand};
use manager::{CallResult, FileId, JobData, ManagerClient, ProfilingKey, Transport};

/// Where a command's job data comes from.
#[derive(Debug, Clone, Default, Args)]
pub struct DataArgs {
    /// Job data as an inline JSON object.
    #[arg(long, conflicts_with = "data_file")]
    pub data: Option<String>,

    /// Path to a file holding the job data as a JSON object.
    #[arg(long)]
    pub data_file: Option<PathBuf>,
}

impl DataArgs {
    /// Parses the job data. With neither flag given the payload is empty.
    pub fn load(&self) -> anyhow::Result<JobData> {
        let text = match (&self.data, &self.data_file) {
            (Some(inline), _) => inline.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("cannot read job data from {}", path.display()))?,
            (None, None) => return Ok(JobData::new()),
        };
        let value: serde_json::Value =
            serde_json::from_str(&text).context("job data is not valid JSON")?;
        match JobData::try_from(value) {
            Ok(data) => Ok(data),
            Err(other) => bail!("job data must be a JSON object, got {other}"),
        }
    }
}

/// Remote operations.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Start an HPC or scaling job.
    Submit(DataArgs),
    /// Store a local file in the remote data store.
    PutInput(DataArgs),
    /// Retrieve the output of a job.
    GetOutput(DataArgs),
    /// Show the ACL of stored data.
    GetAcl(DataArgs),
    /// Change the ACL of stored data.
    SetAcl(DataArgs),
    /// Fetch and compile code on the manager.
    Compile(DataArgs),
    /// List the execution engines available for the given credentials.
    Engines(DataArgs),
    /// Check whether a file exists in the remote data store.
    FileExists {
        /// Path of the file in the data store.
        file: String,
        #[command(flatten)]
        data: DataArgs,
    },
    /// Show the performance and cost history for a key.
    Profile {
        /// Profiling key.
        key: String,
    },
}

impl Command {
    /// Runs the command against `client`.
    pub async fn execute<T: Transport>(self, client: &ManagerClient<T>) -> anyhow::Result<CallResult> {
        let result = match self {
            Command::Submit(data) => client.submit_job(&data.load()?).await?,
            Command::PutInput(data) => client.store_input(&data.load()?).await?,
            Command::GetOutput(data) => client.fetch_output(&data.load()?).await?,
            Command::GetAcl(data) => client.get_acl(&data.load()?).await?,
            Command::SetAcl(data) => client.set_acl(&data.load()?).await?,
            Command::Compile(data) => client.compile_code(&data.load()?).await?,
            Command::Engines(data) => client.list_supported_engines(&data.load()?).await?,
            Command::FileExists { file, data } => {
                let file = FileId::new(file).context("file must not be empty")?;
                client.check_file_existence(&file, &data.load()?).await?
            }
            Command::Profile { key } => {
                let key = ProfilingKey::new(key).context("key must not be empty")?;
                client.get_profiling_info(&key).await?
            }
        };
        Ok(result)
    }
}

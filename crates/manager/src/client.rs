//! Typed bindings for the nine job manager procedures.
//!
//! Every binding follows the same template: build the positional arguments,
//! append the secret, run the call through the [`CallDispatcher`], and, for
//! the six procedures whose textual answers may carry the `Error:` marker,
//! turn a marked answer into [`ManagerError::RemoteJob`].
//!
//! | Method | Procedure | Marker checked |
//! |--------|-----------|----------------|
//! | [`ManagerClient::submit_job`] | `start_job` | yes |
//! | [`ManagerClient::store_input`] | `put_input` | yes |
//! | [`ManagerClient::fetch_output`] | `get_output` | yes |
//! | [`ManagerClient::get_acl`] | `get_acl` | yes |
//! | [`ManagerClient::set_acl`] | `set_acl` | yes |
//! | [`ManagerClient::compile_code`] | `compile_code` | yes |
//! | [`ManagerClient::list_supported_engines`] | `get_supported_babel_engines` | no |
//! | [`ManagerClient::check_file_existence`] | `does_file_exist` | no |
//! | [`ManagerClient::get_profiling_info`] | `get_profiling_info` | no |

use serde_json::Value;
use tracing::instrument;

use crate::{
    CallDispatcher, CallOptions, CallResult, Connection, FileId, JobData, ManagerError,
    Procedure, ProfilingKey, RemoteReply, RetryPolicy, Transport,
};

/// Client for one job manager.
///
/// Wraps a [`Connection`] with the dispatcher and the call options applied to
/// every binding. The defaults (unbounded deadline, no retry on failure,
/// unbounded retry policy) reproduce the manager's long-standing client
/// behaviour; override them with [`ManagerClient::with_call_options`] and
/// [`ManagerClient::with_retry_policy`].
#[derive(Debug)]
pub struct ManagerClient<T> {
    connection: Connection<T>,
    dispatcher: CallDispatcher,
    options: CallOptions,
}

impl<T: Transport> ManagerClient<T> {
    /// Creates a client with default call options and retry policy.
    pub fn new(connection: Connection<T>) -> Self {
        Self {
            connection,
            dispatcher: CallDispatcher::default(),
            options: CallOptions::default(),
        }
    }

    /// Replaces the call options used by every binding.
    #[must_use]
    pub fn with_call_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the dispatcher's retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.dispatcher = CallDispatcher::new(policy);
        self
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> &Connection<T> {
        &self.connection
    }

    /// Returns the call options used by every binding.
    pub fn call_options(&self) -> CallOptions {
        self.options
    }

    // -----------------------------------------------------------------------
    // Marker-checked bindings
    // -----------------------------------------------------------------------

    /// Starts an HPC or scaling job described by `spec`.
    ///
    /// Not for fetching output or changing ACLs; those have their own calls.
    ///
    /// # Errors
    ///
    /// [`ManagerError::RemoteJob`] if the manager rejects the job (bad secret,
    /// unknown engine, ...), plus the dispatcher errors.
    #[instrument(
        name = "manager.start_job",
        skip_all,
        fields(endpoint = %self.connection.endpoint())
    )]
    pub async fn submit_job(&self, spec: &JobData) -> Result<CallResult, ManagerError> {
        self.call(Procedure::StartJob, vec![spec.to_value()]).await
    }

    /// Stores a local file in the remote data store named in `data`.
    #[instrument(
        name = "manager.put_input",
        skip_all,
        fields(endpoint = %self.connection.endpoint())
    )]
    pub async fn store_input(&self, data: &JobData) -> Result<CallResult, ManagerError> {
        self.call(Procedure::PutInput, vec![data.to_value()]).await
    }

    /// Retrieves the output of a job. The content is returned as text.
    #[instrument(
        name = "manager.get_output",
        skip_all,
        fields(endpoint = %self.connection.endpoint())
    )]
    pub async fn fetch_output(&self, data: &JobData) -> Result<CallResult, ManagerError> {
        self.call(Procedure::GetOutput, vec![data.to_value()]).await
    }

    /// Returns the ACL (currently `"public"` or `"private"`) of stored data.
    #[instrument(
        name = "manager.get_acl",
        skip_all,
        fields(endpoint = %self.connection.endpoint())
    )]
    pub async fn get_acl(&self, data: &JobData) -> Result<CallResult, ManagerError> {
        self.call(Procedure::GetAcl, vec![data.to_value()]).await
    }

    /// Changes the ACL of stored data.
    #[instrument(
        name = "manager.set_acl",
        skip_all,
        fields(endpoint = %self.connection.endpoint())
    )]
    pub async fn set_acl(&self, data: &JobData) -> Result<CallResult, ManagerError> {
        self.call(Procedure::SetAcl, vec![data.to_value()]).await
    }

    /// Has the manager fetch and compile code; `data` names where the result goes.
    #[instrument(
        name = "manager.compile_code",
        skip_all,
        fields(endpoint = %self.connection.endpoint())
    )]
    pub async fn compile_code(&self, data: &JobData) -> Result<CallResult, ManagerError> {
        self.call(Procedure::CompileCode, vec![data.to_value()]).await
    }

    // -----------------------------------------------------------------------
    // Unchecked bindings
    // -----------------------------------------------------------------------

    /// Lists the execution engines available for the credentials in `data`.
    ///
    /// The result is returned as received, even if it is marked text.
    #[instrument(
        name = "manager.get_supported_babel_engines",
        skip_all,
        fields(endpoint = %self.connection.endpoint())
    )]
    pub async fn list_supported_engines(
        &self,
        data: &JobData,
    ) -> Result<CallResult, ManagerError> {
        self.call(Procedure::GetSupportedEngines, vec![data.to_value()])
            .await
    }

    /// Asks whether `file` exists in the remote data store. Extra storage
    /// credentials, if needed, are read from `data`.
    ///
    /// The result is returned as received, even if it is marked text.
    #[instrument(
        name = "manager.does_file_exist",
        skip_all,
        fields(endpoint = %self.connection.endpoint())
    )]
    pub async fn check_file_existence(
        &self,
        file: &FileId,
        data: &JobData,
    ) -> Result<CallResult, ManagerError> {
        self.call(
            Procedure::DoesFileExist,
            vec![Value::from(file.as_str()), data.to_value()],
        )
        .await
    }

    /// Returns the performance and cost series recorded under `key`.
    #[instrument(
        name = "manager.get_profiling_info",
        skip_all,
        fields(endpoint = %self.connection.endpoint())
    )]
    pub async fn get_profiling_info(&self, key: &ProfilingKey) -> Result<CallResult, ManagerError> {
        self.call(Procedure::GetProfilingInfo, vec![Value::from(key.as_str())])
            .await
    }

    // -----------------------------------------------------------------------

    async fn call(
        &self,
        procedure: Procedure,
        mut args: Vec<Value>,
    ) -> Result<CallResult, ManagerError> {
        args.push(Value::from(self.connection.secret().expose()));
        debug_assert_eq!(args.len(), procedure.arity());

        let transport = self.connection.transport();
        let params = args.as_slice();
        let result = self
            .dispatcher
            .execute(procedure, self.options, move || {
                transport.invoke(procedure, params)
            })
            .await?;

        if !procedure.inspects_error_marker() {
            return Ok(result);
        }
        match RemoteReply::inspect(result) {
            RemoteReply::Ok(result) => Ok(result),
            RemoteReply::ApplicationError(message) => {
                tracing::warn!(%procedure, %message, "job manager reported an error");
                Err(ManagerError::RemoteJob { message })
            }
        }
    }
}

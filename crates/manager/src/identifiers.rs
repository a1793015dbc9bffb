//! Newtype identifiers used on the wire.
//!
//! Each value the client forwards to the job manager verbatim (addresses, file
//! names, profiling keys) is a distinct newtype so that, for example, a
//! [`FileId`] cannot be passed where a [`ProfilingKey`] is expected. The
//! [`Secret`] is kept apart from the other identifiers because it must never be
//! printed, and [`Procedure`] replaces a runtime method table with a closed set
//! of the nine remote procedure names.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers (string-backed)
// ---------------------------------------------------------------------------

string_id! {
    /// Host name or IP address of the machine running the job manager.
    ///
    /// IPv6 literals may be given with or without surrounding brackets; the
    /// [`crate::Endpoint`] adds them when building the URL.
    ManagerAddress
}

string_id! {
    /// Path of a file in the remote data store (e.g. `"/output/run-7.txt"`).
    FileId
}

string_id! {
    /// Key under which the job manager keeps historical profiling data.
    ProfilingKey
}

// ---------------------------------------------------------------------------
// Secret
// ---------------------------------------------------------------------------

/// Shared authentication token sent as the trailing argument of every call.
///
/// The job manager rejects calls without it. The value is immutable once
/// constructed, has no `Display` implementation, and its `Debug` output is
/// redacted so it cannot leak through logs or error messages.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wraps a secret, returning `None` if it is empty.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        if v.is_empty() {
            None
        } else {
            Some(Self(v))
        }
    }

    /// Returns the raw token. Only the request builder should need this.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

// ---------------------------------------------------------------------------
// Remote procedures
// ---------------------------------------------------------------------------

/// The remote procedures exposed by the job manager.
///
/// The set is static, so it is modelled as an enum instead of being registered
/// by name at connection time. Each variant knows its wire name, how many
/// positional arguments it takes (the secret included), and whether its
/// textual result is scanned for the `Error:` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Procedure {
    /// Starts an HPC or scaling job.
    StartJob,
    /// Stores a local file in the remote data store.
    PutInput,
    /// Retrieves the contents of a stored job output.
    GetOutput,
    /// Reads the ACL of a stored piece of data.
    GetAcl,
    /// Changes the ACL of a stored piece of data.
    SetAcl,
    /// Fetches and compiles code on the remote side.
    CompileCode,
    /// Lists the execution engines available for the given credentials.
    GetSupportedEngines,
    /// Checks whether a file exists in the remote data store.
    DoesFileExist,
    /// Returns the performance and cost series for a key.
    GetProfilingInfo,
}

impl Procedure {
    /// Every procedure, in declaration order.
    pub const ALL: [Procedure; 9] = [
        Procedure::StartJob,
        Procedure::PutInput,
        Procedure::GetOutput,
        Procedure::GetAcl,
        Procedure::SetAcl,
        Procedure::CompileCode,
        Procedure::GetSupportedEngines,
        Procedure::DoesFileExist,
        Procedure::GetProfilingInfo,
    ];

    /// Name of the procedure as the job manager knows it.
    pub fn wire_name(self) -> &'static str {
        match self {
            Procedure::StartJob => "start_job",
            Procedure::PutInput => "put_input",
            Procedure::GetOutput => "get_output",
            Procedure::GetAcl => "get_acl",
            Procedure::SetAcl => "set_acl",
            Procedure::CompileCode => "compile_code",
            Procedure::GetSupportedEngines => "get_supported_babel_engines",
            Procedure::DoesFileExist => "does_file_exist",
            Procedure::GetProfilingInfo => "get_profiling_info",
        }
    }

    /// Number of positional arguments, including the trailing secret.
    pub fn arity(self) -> usize {
        match self {
            Procedure::DoesFileExist => 3,
            _ => 2,
        }
    }

    /// Whether a textual result is checked for the `Error:` marker.
    ///
    /// Engine listing, file existence, and profiling info have never been
    /// checked; the job manager reports their failures as faults only.
    pub fn inspects_error_marker(self) -> bool {
        !matches!(
            self,
            Procedure::GetSupportedEngines | Procedure::DoesFileExist | Procedure::GetProfilingInfo
        )
    }
}

impl std::fmt::Display for Procedure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_identifiers_are_rejected() {
        assert!(ManagerAddress::new("").is_none());
        assert!(FileId::new("").is_none());
        assert!(ProfilingKey::new("").is_none());
        assert!(Secret::new("").is_none());
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new("hunter2").unwrap();
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("hunter2"));
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_engine_listing_uses_the_babel_wire_name() {
        assert_eq!(
            Procedure::GetSupportedEngines.to_string(),
            "get_supported_babel_engines"
        );
        let mut names: Vec<_> = Procedure::ALL.iter().map(|p| p.wire_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Procedure::ALL.len());
    }

    #[test]
    fn test_only_file_existence_takes_three_arguments() {
        let three: Vec<_> = Procedure::ALL.into_iter().filter(|p| p.arity() == 3).collect();
        assert_eq!(three, vec![Procedure::DoesFileExist]);
    }

    #[test]
    fn test_six_procedures_inspect_the_error_marker() {
        let unchecked: Vec<_> = Procedure::ALL
            .into_iter()
            .filter(|p| !p.inspects_error_marker())
            .collect();
        assert_eq!(
            unchecked,
            vec![
                Procedure::GetSupportedEngines,
                Procedure::DoesFileExist,
                Procedure::GetProfilingInfo
            ]
        );
    }
}

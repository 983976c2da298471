#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    Auth,
    PolicyDeny,
    Schema,
    Config,
    Cache,
    Storage,
    Provider,
    Routing,
    Timeout,
    Conflict,
    NotFound,
    Serialization,
    Unknown,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Auth => "Auth",
            ErrorKind::PolicyDeny => "PolicyDeny",
            ErrorKind::Schema => "Schema",
            ErrorKind::Config => "Config",
            ErrorKind::Cache => "Cache",
            ErrorKind::Storage => "Storage",
            ErrorKind::Provider => "Provider",
            ErrorKind::Routing => "Routing",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Serialization => "Serialization",
            ErrorKind::Unknown => "Unknown",
        }
    }
}

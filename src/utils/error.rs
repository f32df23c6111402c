use thiserror::Error;

#[derive(Error, Debug)]
pub enum FareWatchError {
    #[error("Authentication with fare provider failed: {message}")]
    AuthError { message: String },

    #[error("Fare provider rejected the bearer token: {message}")]
    TokenRejected { message: String },

    #[error("Could not resolve IATA code for '{city}': {message}")]
    CodeResolutionError { city: String, message: String },

    #[error("Fare lookup for {destination} failed: {message}")]
    FareLookupError { destination: String, message: String },

    #[error("Notification via {channel} failed: {message}")]
    NotificationError { channel: String, message: String },

    #[error("Data store request failed: {message}")]
    StoreError { message: String },

    #[error("Invalid destination row {id}: {reason}")]
    InvalidDestinationError { id: String, reason: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    Lookup,
    Notification,
    Storage,
    Configuration,
    Transport,
}

impl FareWatchError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AuthError { .. } | Self::TokenRejected { .. } => ErrorCategory::Authentication,
            Self::CodeResolutionError { .. } | Self::FareLookupError { .. } => {
                ErrorCategory::Lookup
            }
            Self::NotificationError { .. } => ErrorCategory::Notification,
            Self::StoreError { .. } | Self::InvalidDestinationError { .. } => {
                ErrorCategory::Storage
            }
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::ApiError(_) | Self::SerializationError(_) | Self::IoError(_) => {
                ErrorCategory::Transport
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotificationError { .. } | Self::InvalidDestinationError { .. } => {
                ErrorSeverity::Low
            }
            Self::CodeResolutionError { .. }
            | Self::FareLookupError { .. }
            | Self::TokenRejected { .. } => ErrorSeverity::Medium,
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ApiError(_)
            | Self::SerializationError(_)
            | Self::IoError(_) => ErrorSeverity::High,
            Self::AuthError { .. } | Self::StoreError { .. } => ErrorSeverity::Critical,
        }
    }

    /// 是否必須中止整個執行
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::AuthError { .. }
                | Self::ConfigError { .. }
                | Self::MissingConfigError { .. }
                | Self::InvalidConfigValueError { .. }
        )
    }

    /// 簡短的分類名稱，用於執行摘要
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AuthError { .. } => "auth",
            Self::TokenRejected { .. } => "token_rejected",
            Self::CodeResolutionError { .. } => "code_resolution",
            Self::FareLookupError { .. } => "fare_lookup",
            Self::NotificationError { .. } => "notification",
            Self::StoreError { .. } => "store",
            Self::InvalidDestinationError { .. } => "invalid_destination",
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => "config",
            Self::ApiError(_) => "http",
            Self::SerializationError(_) => "serialization",
            Self::IoError(_) => "io",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::AuthError { .. } => {
                "Could not sign in to the flight search provider; no fares were checked.".to_string()
            }
            Self::StoreError { message } => format!("Could not read the destination sheet: {}", message),
            Self::MissingConfigError { field } => format!("Missing setting: {}", field),
            Self::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting {} is invalid: {}", field, reason)
            }
            Self::ConfigError { message } => format!("Configuration problem: {}", message),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Authentication => {
                "Check AMADEUS_API_KEY / AMADEUS_API_SECRET and that the key is active"
            }
            ErrorCategory::Lookup => "Check the city name and trip dates in the sheet",
            ErrorCategory::Notification => "Check the Twilio and email API credentials",
            ErrorCategory::Storage => {
                "Check SHEETY_PRICES_ENDPOINT, the sheet token and the row contents"
            }
            ErrorCategory::Configuration => "Review your .env file or --config TOML file",
            ErrorCategory::Transport => "Check network connectivity and retry later",
        }
    }
}

pub type Result<T> = std::result::Result<T, FareWatchError>;

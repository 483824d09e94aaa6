use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Bands in image [{available}] not correct")]
    MissingBands { available: String },

    #[error("Scene {id} has no usable '{field}'")]
    InvalidScene { id: String, field: &'static str },

    #[error("Footprint has no coordinates")]
    EmptyFootprint,

    #[error("Environment variable {0} is not set")]
    MissingCredential(&'static str),

    #[error("Geocoding dataset {0} contains no places")]
    EmptyGazetteer(String),

    #[error("Composite has no channel named '{0}'")]
    UnknownChannel(String),

    #[error("OAuth response is missing '{0}'")]
    OAuthResponse(&'static str),

    #[error("Posting requested but no publisher is configured")]
    NoPublisher,

    #[error("Invalid post time '{0}', expected HH:MM")]
    InvalidSchedule(String),
}

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct CreateEventArgs {
    pub(crate) summary: String,
    pub(crate) start_datetime: String,
    pub(crate) end_datetime: String,
    #[serde(default)]
    pub(crate) timezone: Option<String>,
    #[serde(default)]
    pub(crate) location: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) color_id: Option<String>,
    #[serde(default)]
    pub(crate) calendar_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchEventsArgs {
    #[serde(default)]
    pub(crate) query: Option<String>,
    #[serde(default)]
    pub(crate) time_min: Option<String>,
    #[serde(default)]
    pub(crate) time_max: Option<String>,
    #[serde(default)]
    pub(crate) max_results: Option<usize>,
    #[serde(default)]
    pub(crate) calendar_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateEventArgs {
    pub(crate) event_id: String,
    #[serde(default)]
    pub(crate) summary: Option<String>,
    #[serde(default)]
    pub(crate) start_datetime: Option<String>,
    #[serde(default)]
    pub(crate) end_datetime: Option<String>,
    #[serde(default)]
    pub(crate) timezone: Option<String>,
    #[serde(default)]
    pub(crate) location: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) color_id: Option<String>,
    #[serde(default)]
    pub(crate) calendar_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MoveEventArgs {
    pub(crate) event_id: String,
    pub(crate) destination_calendar_id: String,
    #[serde(default)]
    pub(crate) calendar_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeleteEventArgs {
    pub(crate) event_id: String,
    #[serde(default)]
    pub(crate) calendar_id: Option<String>,
}

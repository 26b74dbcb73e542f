use serde::Deserialize;

/// Body of `POST /category`. Fields are optional so that missing ones
/// surface as validation errors rather than decode failures.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: Option<String>,
    #[serde(alias = "color")]
    pub color_hex: Option<String>,
}

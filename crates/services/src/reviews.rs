use serde::{Deserialize, Serialize};

const PLACE_DETAILS_URL: &str = "https://maps.googleapis.com/maps/api/place/details/json";

#[derive(Debug, Deserialize)]
struct PlaceDetailsResponse {
    status: String,
    error_message: Option<String>,
    result: Option<PlaceDetails>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlaceDetails {
    pub rating: Option<f64>,
    #[serde(default)]
    pub user_ratings_total: u32,
    #[serde(default)]
    pub reviews: Vec<PlaceReview>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlaceReview {
    pub author_name: String,
    pub rating: u8,
    #[serde(default)]
    pub text: String,
    pub relative_time_description: Option<String>,
    pub profile_photo_url: Option<String>,
    pub time: Option<i64>,
}

pub struct ReviewsService {
    client: reqwest::Client,
    api_key: String,
    place_id: String,
}

impl ReviewsService {
    pub fn new(api_key: String, place_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            place_id,
        }
    }

    pub async fn fetch(&self, language: Option<&str>) -> anyhow::Result<PlaceDetails> {
        let resp = self
            .client
            .get(PLACE_DETAILS_URL)
            .query(&[
                ("place_id", self.place_id.as_str()),
                ("fields", "rating,user_ratings_total,reviews"),
                ("key", self.api_key.as_str()),
            ])
            .query(&[("language", language.unwrap_or("en"))])
            .send()
            .await?
            .error_for_status()?
            .json::<PlaceDetailsResponse>()
            .await?;

        if resp.status != "OK" {
            anyhow::bail!(
                "Places API returned {}: {}",
                resp.status,
                resp.error_message.unwrap_or_default()
            );
        }
        resp.result
            .ok_or_else(|| anyhow::anyhow!("Places API response has no result"))
    }
}

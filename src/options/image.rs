use serde::{Deserialize, Serialize};

use crate::api::image::YtoAiImageRequest;
use crate::model::ImageOptions;

/// Image options for the YtoAI API.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct YtoAiImageOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// End-user id, 6 to 128 characters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl From<&ImageOptions> for YtoAiImageOptions {
    fn from(options: &ImageOptions) -> Self {
        Self {
            model: options.model.clone(),
            user: options.user.clone(),
        }
    }
}

impl YtoAiImageOptions {
    /// Fields set on `runtime` replace the ones set here.
    pub fn merge(&self, runtime: Option<&ImageOptions>) -> Self {
        let Some(runtime) = runtime.map(YtoAiImageOptions::from) else {
            return self.clone();
        };
        Self {
            model: runtime.model.or_else(|| self.model.clone()),
            user: runtime.user.or_else(|| self.user.clone()),
        }
    }

    /// Overwrite the fields of `request` that are set here.
    pub fn apply_to(&self, request: &mut YtoAiImageRequest) {
        if let Some(model) = &self.model {
            request.model = Some(model.clone());
        }
        if let Some(user) = &self.user {
            request.user = Some(user.clone());
        }
    }
}

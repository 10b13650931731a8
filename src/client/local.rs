use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

use crate::level::{CampaignLevelInfo, LevelCode};

// Shape of an entry in the campaign levels metadata file.
#[derive(Debug, Deserialize)]
struct StoredCampaignLevelInfo {
    id: String,
    code: String,
    name: String,
    budget: f64,
    #[serde(default)]
    bonus: bool,
}

/// Load the static campaign level catalog. A missing or malformed file yields
/// an empty catalog, entries with an unparseable code are skipped.
pub async fn load_campaign_level_infos(path: impl AsRef<Path>) -> Vec<CampaignLevelInfo> {
    let path = path.as_ref();
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            warn!("Could not read campaign levels from {}. {e}", path.display());
            return vec![];
        }
    };
    let infos = parse_campaign_level_infos(&content);
    info!("Loaded {} campaign levels from {}", infos.len(), path.display());
    infos
}

pub fn parse_campaign_level_infos(content: &str) -> Vec<CampaignLevelInfo> {
    let stored = match serde_json::from_str::<Vec<StoredCampaignLevelInfo>>(content) {
        Ok(stored) => stored,
        Err(e) => {
            warn!("Malformed campaign levels metadata. {e}");
            return vec![];
        }
    };

    stored
        .into_iter()
        .filter_map(|info| match LevelCode::parse(&info.code) {
            Some(code) => Some(CampaignLevelInfo {
                id: info.id,
                code,
                name: info.name,
                budget: info.budget,
                bonus: info.bonus,
            }),
            None => {
                warn!("Skipping campaign level {} with invalid code '{}'", info.id, info.code);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_catalog_and_skips_bad_codes() {
        let content = r#"[
            {"id": "a", "code": "1-1", "name": "Hello", "budget": 3000},
            {"id": "b", "code": "1-1c", "name": "Hello Again", "budget": 5000, "bonus": false},
            {"id": "c", "code": "garbage", "name": "Broken", "budget": 1},
            {"id": "d", "code": "7-1", "name": "Extra", "budget": 9000, "bonus": true}
        ]"#;
        let infos = parse_campaign_level_infos(content);

        assert_eq!(infos.len(), 3);
        assert_eq!(infos[0].code, LevelCode::new(1, 1, false));
        assert!(infos[1].code.is_challenge);
        assert!(infos[2].bonus);
        assert_eq!(infos[2].budget, 9000.0);
    }

    #[test]
    fn malformed_catalog_is_empty() {
        assert!(parse_campaign_level_infos("{not json").is_empty());
        assert!(parse_campaign_level_infos(r#"{"id": "a"}"#).is_empty());
    }

    #[tokio::test]
    async fn missing_catalog_file_is_empty() {
        let infos = load_campaign_level_infos("/definitely/not/here/levels.json").await;
        assert!(infos.is_empty());
    }
}

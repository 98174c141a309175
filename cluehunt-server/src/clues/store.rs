//! Persisted game configuration with a single writer
//!
//! Readers take an `Arc<ClueGraph>` snapshot. Admin mutations queue on one
//! writer lock, apply to a copy, validate, persist to disk (temp file, fsync,
//! rename) and only then swap the snapshot in. A mutation that fails at any
//! step leaves both the file and the live snapshot untouched.

use super::model::{
    Clue, ClueGraph, ClueRecord, GameConfig, ValidationMode, DEFAULT_RADIUS_METERS,
};
use crate::error::{HuntError, HuntResult};
use cluehunt_common::config::GAME_CONFIG_FILE;
use image::{ImageFormat, Rgb, RgbImage};
use rand::Rng;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Folder (relative to the data folder) holding reference images
pub const CLUE_ASSETS_DIR: &str = "assets/clues";

/// Side length of generated placeholder reference images
const PLACEHOLDER_SIZE: u32 = 512;

/// Admin request body for a new clue
///
/// Only `id` and `name` are required; coordinates default to 0 and the radius
/// to 50 m. The reference image path defaults to `assets/clues/{id}.jpg`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClue {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lng: f64,
    #[serde(default)]
    pub radius_meters: Option<f64>,
    #[serde(default)]
    pub validation_mode: Option<ValidationMode>,
    #[serde(default)]
    pub require_photo: Option<bool>,
    #[serde(default, rename = "requireQA")]
    pub require_qa: Option<bool>,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub expected_answer: String,
    #[serde(default, alias = "hints")]
    pub hints_generic: Vec<String>,
    #[serde(default, alias = "hintsPhoto")]
    pub hints_photo_failure: Vec<String>,
    #[serde(default, alias = "hintsAnswer")]
    pub hints_answer_failure: Vec<String>,
    #[serde(default, alias = "hint")]
    pub success_message: String,
    #[serde(default)]
    pub next_clue_id: Option<String>,
}

/// Admin request body for a partial clue update
///
/// Absent fields are left unchanged. An empty `nextClueId` clears the
/// successor. Setting a legacy flag without `validationMode` re-derives the
/// mode from the flags.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClueUpdate {
    pub name: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_meters: Option<f64>,
    pub validation_mode: Option<ValidationMode>,
    pub require_photo: Option<bool>,
    #[serde(rename = "requireQA")]
    pub require_qa: Option<bool>,
    pub question: Option<String>,
    pub expected_answer: Option<String>,
    #[serde(alias = "hints")]
    pub hints_generic: Option<Vec<String>>,
    #[serde(alias = "hintsPhoto")]
    pub hints_photo_failure: Option<Vec<String>>,
    #[serde(alias = "hintsAnswer")]
    pub hints_answer_failure: Option<Vec<String>>,
    #[serde(alias = "hint")]
    pub success_message: Option<String>,
    pub next_clue_id: Option<String>,
}

impl ClueUpdate {
    fn apply(self, record: &mut ClueRecord) {
        let flags_changed = self.require_photo.is_some() || self.require_qa.is_some();

        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(lat) = self.lat {
            record.lat = lat;
        }
        if let Some(lng) = self.lng {
            record.lng = lng;
        }
        if let Some(radius) = self.radius_meters {
            record.radius_meters = radius;
        }
        if self.require_photo.is_some() {
            record.require_photo = self.require_photo;
        }
        if self.require_qa.is_some() {
            record.require_qa = self.require_qa;
        }
        match self.validation_mode {
            Some(mode) => record.validation_mode = Some(mode),
            None if flags_changed => record.validation_mode = None,
            None => {}
        }
        if let Some(question) = self.question {
            record.question = question;
        }
        if let Some(answer) = self.expected_answer {
            record.expected_answer = answer;
        }
        if let Some(hints) = self.hints_generic {
            record.hints_generic = hints;
        }
        if let Some(hints) = self.hints_photo_failure {
            record.hints_photo_failure = hints;
        }
        if let Some(hints) = self.hints_answer_failure {
            record.hints_answer_failure = hints;
        }
        if let Some(message) = self.success_message {
            record.success_message = message;
        }
        if let Some(next) = self.next_clue_id {
            record.next_clue_id = Some(next);
        }
    }
}

/// Owner of the live game configuration
pub struct ConfigStore {
    data_dir: PathBuf,
    path: PathBuf,
    current: RwLock<Arc<ClueGraph>>,
    writer: Mutex<()>,
}

impl ConfigStore {
    /// Load `gameConfig.json` from `data_dir`, writing a sample if absent
    pub async fn open(data_dir: impl Into<PathBuf>) -> HuntResult<Self> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(&data_dir).await?;
        let path = data_dir.join(GAME_CONFIG_FILE);

        let config = if tokio::fs::try_exists(&path).await? {
            let content = tokio::fs::read_to_string(&path).await?;
            let config: GameConfig = serde_json::from_str(&content)?;
            info!(
                "Loaded game config from {} ({} clues)",
                path.display(),
                config.clues.len()
            );
            config
        } else {
            warn!(
                "No game config at {}, writing a sample configuration",
                path.display()
            );
            let config = GameConfig::sample();
            persist(&path, &config).await?;
            config
        };

        let graph = ClueGraph::new(config).map_err(|e| {
            HuntError::Common(cluehunt_common::Error::Config(format!(
                "{}: {}",
                path.display(),
                e
            )))
        })?;

        Ok(Self {
            data_dir,
            path,
            current: RwLock::new(Arc::new(graph)),
            writer: Mutex::new(()),
        })
    }

    /// Persist `config` into `data_dir` and open a store on it
    pub async fn create(data_dir: impl Into<PathBuf>, config: GameConfig) -> HuntResult<Self> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(&data_dir).await?;
        ClueGraph::new(config.clone()).map_err(HuntError::InvalidInput)?;
        persist(&data_dir.join(GAME_CONFIG_FILE), &config).await?;
        Self::open(data_dir).await
    }

    /// Current configuration snapshot
    pub fn snapshot(&self) -> Arc<ClueGraph> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Absolute path of a clue's reference image, if it has one
    pub fn reference_image_path(&self, clue: &Clue) -> Option<PathBuf> {
        clue.reference_image
            .as_deref()
            .map(|relative| self.data_dir.join(relative))
    }

    /// Point the hunt at a different first clue
    pub async fn set_start_clue(&self, clue_id: &str) -> HuntResult<()> {
        self.commit(|config| {
            if !config.clues.iter().any(|c| c.id == clue_id) {
                return Err(HuntError::InvalidClue(clue_id.to_string()));
            }
            config.start_clue_id = clue_id.to_string();
            Ok(())
        })
        .await?;
        info!(clue_id = %clue_id, "Start clue updated");
        Ok(())
    }

    /// Add a clue
    pub async fn create_clue(&self, new: NewClue) -> HuntResult<Clue> {
        let id = new.id.trim().to_string();
        if id.is_empty() || new.name.trim().is_empty() {
            return Err(HuntError::InvalidInput("id and name required".to_string()));
        }

        let record = ClueRecord {
            reference_image: Some(format!("{}/{}.jpg", CLUE_ASSETS_DIR, id)),
            id: id.clone(),
            name: new.name,
            lat: new.lat,
            lng: new.lng,
            radius_meters: new.radius_meters.unwrap_or(DEFAULT_RADIUS_METERS),
            validation_mode: new.validation_mode,
            require_photo: new.require_photo,
            require_qa: new.require_qa,
            question: new.question,
            expected_answer: new.expected_answer,
            hints_generic: new.hints_generic,
            hints_photo_failure: new.hints_photo_failure,
            hints_answer_failure: new.hints_answer_failure,
            success_message: new.success_message,
            next_clue_id: new.next_clue_id,
        };
        let clue = Clue::try_from(record).map_err(HuntError::InvalidInput)?;

        let created = clue.clone();
        self.commit(move |config| {
            if config.clues.iter().any(|c| c.id == clue.id) {
                return Err(HuntError::ClueExists(clue.id));
            }
            if config.clues.is_empty() {
                config.start_clue_id = clue.id.clone();
            }
            config.clues.push(clue);
            Ok(())
        })
        .await?;

        info!(clue_id = %created.id, "Clue created");
        Ok(created)
    }

    /// Apply a partial update to a clue
    pub async fn update_clue(&self, clue_id: &str, update: ClueUpdate) -> HuntResult<Clue> {
        let updated = self
            .commit(|config| {
                let slot = config
                    .clues
                    .iter_mut()
                    .find(|c| c.id == clue_id)
                    .ok_or_else(|| not_found(clue_id))?;
                let mut record = ClueRecord::from(slot.clone());
                update.apply(&mut record);
                let clue = Clue::try_from(record).map_err(HuntError::InvalidInput)?;
                *slot = clue.clone();
                Ok(clue)
            })
            .await?;

        info!(clue_id = %clue_id, mode = ?updated.mode, "Clue updated");
        Ok(updated)
    }

    /// Remove a clue
    ///
    /// If it was the start clue, the first remaining clue becomes the start.
    /// Other clues' `nextClueId` pointers are left alone.
    pub async fn delete_clue(&self, clue_id: &str) -> HuntResult<()> {
        self.commit(|config| {
            let position = config
                .clues
                .iter()
                .position(|c| c.id == clue_id)
                .ok_or_else(|| not_found(clue_id))?;
            config.clues.remove(position);
            if config.start_clue_id == clue_id {
                if let Some(first) = config.clues.first() {
                    config.start_clue_id = first.id.clone();
                }
            }
            Ok(())
        })
        .await?;
        info!(clue_id = %clue_id, "Clue deleted");
        Ok(())
    }

    /// Store new reference image bytes for a clue and point the clue at them
    ///
    /// The file extension follows the detected image format. The upload is
    /// staged next to its destination and renamed into place only after the
    /// config naming it is persisted, so a reader sees either the old or the
    /// new image in full. A replaced file under a different name is removed.
    pub async fn set_reference_image(&self, clue_id: &str, bytes: &[u8]) -> HuntResult<String> {
        let format = image::guess_format(bytes)
            .map_err(|e| HuntError::InvalidInput(format!("unrecognized image: {}", e)))?;
        let extension = format.extensions_str().first().copied().unwrap_or("img");
        let relative = format!("{}/{}.{}", CLUE_ASSETS_DIR, clue_id, extension);

        let _guard = self.writer.lock().await;
        let previous = self.snapshot();
        let replaced = previous
            .clue(clue_id)
            .ok_or_else(|| not_found(clue_id))?
            .reference_image
            .clone()
            .filter(|old| *old != relative);

        let destination = self.data_dir.join(&relative);
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let staged = staging_path(&destination);
        let installed = async {
            write_synced(&staged, bytes).await?;
            self.install_image(&previous, clue_id, &relative, &staged, &destination).await
        }
        .await;
        if let Err(e) = installed {
            if let Err(cleanup) = tokio::fs::remove_file(&staged).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove staged upload {}: {}", staged.display(), cleanup);
                }
            }
            return Err(e);
        }

        if let Some(old) = replaced {
            let old_path = self.data_dir.join(&old);
            match tokio::fs::remove_file(&old_path).await {
                Ok(()) => info!(clue_id = %clue_id, "Removed replaced reference image {}", old),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {}: {}", old_path.display(), e),
            }
        }

        info!(clue_id = %clue_id, path = %relative, "Reference image set");
        Ok(relative)
    }

    /// Persist the new image path, move the staged file into place, swap
    ///
    /// Caller must hold `self.writer`. If the rename fails the previous
    /// config is written back so file and snapshot keep agreeing.
    async fn install_image(
        &self,
        previous: &ClueGraph,
        clue_id: &str,
        relative: &str,
        staged: &Path,
        destination: &Path,
    ) -> HuntResult<()> {
        let mut config = previous.config().clone();
        let clue = config
            .clues
            .iter_mut()
            .find(|c| c.id == clue_id)
            .ok_or_else(|| not_found(clue_id))?;
        clue.reference_image = Some(relative.to_string());
        let graph = ClueGraph::new(config).map_err(HuntError::InvalidInput)?;

        persist(&self.path, graph.config()).await?;
        if let Err(e) = tokio::fs::rename(staged, destination).await {
            if let Err(restore) = persist(&self.path, previous.config()).await {
                warn!("Failed to restore {}: {}", self.path.display(), restore);
            }
            return Err(e.into());
        }

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(graph);
        Ok(())
    }

    /// Replace the global fallback tip lists; `None` leaves a list unchanged
    pub async fn set_tips(
        &self,
        wrong_image_tips: Option<Vec<String>>,
        wrong_answer_tips: Option<Vec<String>>,
    ) -> HuntResult<()> {
        let clean = |tips: Vec<String>| -> Vec<String> {
            tips.into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect()
        };
        self.commit(|config| {
            if let Some(tips) = wrong_image_tips {
                config.wrong_image_tips = clean(tips);
            }
            if let Some(tips) = wrong_answer_tips {
                config.wrong_answer_tips = clean(tips);
            }
            Ok(())
        })
        .await?;
        info!("Global tips updated");
        Ok(())
    }

    /// Generate solid-colour placeholders for missing reference images
    ///
    /// Only clues whose mode includes a photo and that name a reference image
    /// are considered. Returns how many placeholders were written.
    pub async fn ensure_reference_images(&self) -> HuntResult<usize> {
        let graph = self.snapshot();
        let mut generated = 0;

        for clue in graph.clues().iter().filter(|c| c.mode.requires_photo()) {
            let Some(path) = self.reference_image_path(clue) else {
                warn!(clue_id = %clue.id, "Photo clue has no reference image configured");
                continue;
            };
            if tokio::fs::try_exists(&path).await? {
                continue;
            }
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            let color: [u8; 3] = rand::thread_rng().gen();
            let target = path.clone();
            tokio::task::spawn_blocking(move || {
                RgbImage::from_pixel(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, Rgb(color))
                    .save_with_format(&target, ImageFormat::Jpeg)
            })
            .await
            .map_err(|e| HuntError::Internal(format!("placeholder task failed: {}", e)))?
            .map_err(|e| HuntError::Internal(format!("placeholder encode failed: {}", e)))?;

            info!(
                clue_id = %clue.id,
                "Generated placeholder reference image at {}",
                path.display()
            );
            generated += 1;
        }

        Ok(generated)
    }

    async fn commit<T>(
        &self,
        mutate: impl FnOnce(&mut GameConfig) -> HuntResult<T>,
    ) -> HuntResult<T> {
        let _guard = self.writer.lock().await;
        let mut config = self.snapshot().config().clone();
        let output = mutate(&mut config)?;
        let graph = ClueGraph::new(config).map_err(HuntError::InvalidInput)?;
        persist(&self.path, graph.config()).await?;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(graph);
        Ok(output)
    }
}

fn not_found(clue_id: &str) -> HuntError {
    HuntError::Common(cluehunt_common::Error::NotFound(format!(
        "clue '{}'",
        clue_id
    )))
}

/// Write the config durably: temp file, fsync, rename over the original
async fn persist(path: &Path, config: &GameConfig) -> HuntResult<()> {
    let json = serde_json::to_vec_pretty(config)?;
    let tmp = path.with_extension("json.tmp");
    write_synced(&tmp, &json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

async fn write_synced(path: &Path, bytes: &[u8]) -> HuntResult<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}

/// Sibling of `destination` an upload is written to before it goes live
fn staging_path(destination: &Path) -> PathBuf {
    let mut staged = destination.as_os_str().to_os_string();
    staged.push(".upload");
    PathBuf::from(staged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn two_clue_config() -> GameConfig {
        serde_json::from_value(json!({
            "startClueId": "a",
            "clues": [
                { "id": "a", "name": "Alpha", "lat": 1.0, "lng": 1.0, "nextClueId": "b" },
                { "id": "b", "name": "Beta", "lat": 2.0, "lng": 2.0, "validationMode": "qa",
                  "question": "Q?", "expectedAnswer": "yes" }
            ]
        }))
        .unwrap()
    }

    async fn reopen(dir: &TempDir) -> Arc<ClueGraph> {
        ConfigStore::open(dir.path()).await.unwrap().snapshot()
    }

    #[tokio::test]
    async fn test_missing_config_bootstraps_sample() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::open(dir.path()).await.unwrap();

        assert_eq!(store.snapshot().start_clue_id(), "start");
        assert!(dir.path().join(GAME_CONFIG_FILE).exists());
    }

    #[tokio::test]
    async fn test_create_clue_applies_defaults_and_persists() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::create(dir.path(), two_clue_config()).await.unwrap();

        let new: NewClue =
            serde_json::from_value(json!({ "id": "c", "name": "Gamma" })).unwrap();
        let clue = store.create_clue(new).await.unwrap();

        assert_eq!(clue.radius_meters, DEFAULT_RADIUS_METERS);
        assert_eq!(clue.reference_image.as_deref(), Some("assets/clues/c.jpg"));
        assert_eq!(clue.mode, ValidationMode::Photo);
        assert!(reopen(&dir).await.contains("c"));
    }

    #[tokio::test]
    async fn test_create_duplicate_clue_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::create(dir.path(), two_clue_config()).await.unwrap();

        let new: NewClue = serde_json::from_value(json!({ "id": "a", "name": "Again" })).unwrap();
        assert!(matches!(
            store.create_clue(new).await,
            Err(HuntError::ClueExists(_))
        ));

        let nameless: NewClue = serde_json::from_value(json!({ "id": "z", "name": " " })).unwrap();
        assert!(matches!(
            store.create_clue(nameless).await,
            Err(HuntError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_update_merges_and_rederives_mode() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::create(dir.path(), two_clue_config()).await.unwrap();

        let update: ClueUpdate =
            serde_json::from_value(json!({ "requireQA": true, "radiusMeters": 75 })).unwrap();
        let clue = store.update_clue("a", update).await.unwrap();

        assert_eq!(clue.mode, ValidationMode::Both);
        assert_eq!(clue.radius_meters, 75.0);
        assert_eq!(clue.name, "Alpha");
        assert_eq!(clue.next_clue_id.as_deref(), Some("b"));

        let clear: ClueUpdate = serde_json::from_value(json!({ "nextClueId": "" })).unwrap();
        let clue = store.update_clue("a", clear).await.unwrap();
        assert!(clue.next_clue_id.is_none());
    }

    #[tokio::test]
    async fn test_invalid_update_leaves_config_unchanged() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::create(dir.path(), two_clue_config()).await.unwrap();

        let update: ClueUpdate = serde_json::from_value(json!({ "radiusMeters": -5 })).unwrap();
        assert!(store.update_clue("a", update).await.is_err());

        assert_eq!(store.snapshot().clue("a").unwrap().radius_meters, 50.0);
        assert_eq!(reopen(&dir).await.clue("a").unwrap().radius_meters, 50.0);
    }

    #[tokio::test]
    async fn test_deleting_start_clue_moves_start() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::create(dir.path(), two_clue_config()).await.unwrap();

        store.delete_clue("a").await.unwrap();
        let graph = store.snapshot();
        assert_eq!(graph.start_clue_id(), "b");
        assert!(!graph.contains("a"));

        assert!(matches!(
            store.delete_clue("a").await,
            Err(HuntError::Common(cluehunt_common::Error::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_set_start_requires_existing_clue() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::create(dir.path(), two_clue_config()).await.unwrap();

        store.set_start_clue("b").await.unwrap();
        assert_eq!(reopen(&dir).await.start_clue_id(), "b");
        assert!(matches!(
            store.set_start_clue("nope").await,
            Err(HuntError::InvalidClue(_))
        ));
    }

    #[tokio::test]
    async fn test_set_tips_leaves_absent_list_untouched() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::create(dir.path(), two_clue_config()).await.unwrap();

        store
            .set_tips(
                Some(vec!["Check the angle".into(), " ".into()]),
                Some(vec!["Spelling?".into()]),
            )
            .await
            .unwrap();
        store.set_tips(None, Some(Vec::new())).await.unwrap();

        let graph = store.snapshot();
        assert_eq!(graph.wrong_image_tips(), ["Check the angle".to_string()]);
        assert!(graph.wrong_answer_tips().is_empty());
    }

    fn encoded(rgb: [u8; 3], format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb(rgb)))
            .write_to(&mut std::io::Cursor::new(&mut bytes), format)
            .unwrap();
        bytes
    }

    #[tokio::test]
    async fn test_reference_image_upload_uses_detected_extension() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::create(dir.path(), two_clue_config()).await.unwrap();

        let png = encoded([9, 9, 9], ImageFormat::Png);
        let relative = store.set_reference_image("a", &png).await.unwrap();
        assert_eq!(relative, "assets/clues/a.png");
        assert_eq!(std::fs::read(dir.path().join(&relative)).unwrap(), png);
        assert!(!dir.path().join("assets/clues/a.png.upload").exists());
        assert_eq!(
            store.snapshot().clue("a").unwrap().reference_image.as_deref(),
            Some("assets/clues/a.png")
        );

        assert!(matches!(
            store.set_reference_image("a", b"plain text").await,
            Err(HuntError::InvalidInput(_))
        ));
        assert!(matches!(
            store.set_reference_image("zz", &png).await,
            Err(HuntError::Common(cluehunt_common::Error::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_new_extension_removes_replaced_image() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::create(dir.path(), two_clue_config()).await.unwrap();

        let jpeg = encoded([40, 80, 120], ImageFormat::Jpeg);
        assert_eq!(
            store.set_reference_image("a", &jpeg).await.unwrap(),
            "assets/clues/a.jpg"
        );
        let png = encoded([40, 80, 120], ImageFormat::Png);
        store.set_reference_image("a", &png).await.unwrap();

        assert!(!dir.path().join("assets/clues/a.jpg").exists());
        assert!(dir.path().join("assets/clues/a.png").exists());
        assert_eq!(
            reopen(&dir).await.clue("a").unwrap().reference_image.as_deref(),
            Some("assets/clues/a.png")
        );
    }

    #[tokio::test]
    async fn test_failed_persist_keeps_previous_reference_image() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::create(dir.path(), two_clue_config()).await.unwrap();

        let original = encoded([1, 2, 3], ImageFormat::Png);
        store.set_reference_image("a", &original).await.unwrap();

        // A directory where the config temp file goes makes persisting fail
        std::fs::create_dir(dir.path().join("gameConfig.json.tmp")).unwrap();

        let same_name = encoded([200, 10, 10], ImageFormat::Png);
        assert!(store.set_reference_image("a", &same_name).await.is_err());
        let other_name = encoded([200, 10, 10], ImageFormat::Jpeg);
        assert!(store.set_reference_image("a", &other_name).await.is_err());

        let assets = dir.path().join(CLUE_ASSETS_DIR);
        assert_eq!(std::fs::read(assets.join("a.png")).unwrap(), original);
        assert!(!assets.join("a.jpg").exists());
        assert!(!assets.join("a.png.upload").exists());
        assert!(!assets.join("a.jpg.upload").exists());
        assert_eq!(
            store.snapshot().clue("a").unwrap().reference_image.as_deref(),
            Some("assets/clues/a.png")
        );

        std::fs::remove_dir(dir.path().join("gameConfig.json.tmp")).unwrap();
        assert_eq!(
            reopen(&dir).await.clue("a").unwrap().reference_image.as_deref(),
            Some("assets/clues/a.png")
        );
    }

    #[tokio::test]
    async fn test_placeholders_generated_for_photo_clues_only() {
        let dir = TempDir::new().unwrap();
        let mut config = two_clue_config();
        config.clues[0].reference_image = Some("assets/clues/a.jpg".to_string());
        config.clues[1].reference_image = Some("assets/clues/b.jpg".to_string());
        let store = ConfigStore::create(dir.path(), config).await.unwrap();

        assert_eq!(store.ensure_reference_images().await.unwrap(), 1);
        assert!(dir.path().join("assets/clues/a.jpg").exists());
        assert!(!dir.path().join("assets/clues/b.jpg").exists());

        // Second pass finds nothing missing
        assert_eq!(store.ensure_reference_images().await.unwrap(), 0);
    }
}

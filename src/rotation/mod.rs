pub mod recorder;
pub mod workflow;

pub use recorder::{FileKeyRecorder, KeyRecorder, MemoryKeyRecorder, RecordedKey};
pub use workflow::{select_projects, KeyRotator, ProjectOutcome, RotationSummary};

use crate::client::CircleCiClient;
use crate::config::{Config, Vcs};
use crate::error::Result;
use crate::security::{InputValidator, SecureString};
use std::path::PathBuf;
use tracing::info;

/// Inputs of one rotation run as they arrive from the command line
pub struct RunConfig {
    pub api_token: String,
    pub organization: String,
    pub vcs: String,
    /// Empty means every eligible project
    pub project: String,
    pub config_path: Option<String>,
    pub api_url: Option<String>,
    pub output_dir: Option<PathBuf>,
}

/// Validate inputs, resolve configuration and run the rotation.
///
/// Everything that can be checked locally (VCS identifier, names, token,
/// configuration) is checked before the first request goes out.
pub async fn handle_rotate_command(run: RunConfig) -> Result<RotationSummary> {
    let vcs: Vcs = run.vcs.parse()?;

    let validator = InputValidator::default();
    validator.validate_token(&run.api_token)?;
    validator.validate_path_segment("organization", &run.organization)?;
    let project_filter = Some(run.project.as_str()).filter(|p| !p.is_empty());
    if let Some(project) = project_filter {
        validator.validate_path_segment("project", project)?;
    }

    let mut config = match run.config_path.as_deref() {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(api_url) = run.api_url {
        config.api.base_url = api_url;
    }
    if let Some(output_dir) = run.output_dir {
        config.output.directory = output_dir;
    }
    config.validate()?;

    let client = CircleCiClient::new(&config.api, SecureString::from(run.api_token))?;
    let recorder = FileKeyRecorder::new(config.output.directory());
    let rotator = KeyRotator::new(client, run.organization, vcs, recorder);

    let summary = rotator.run(project_filter).await?;

    info!(
        organization = %rotator.organization(),
        checked = summary.outcomes().len(),
        rotated = summary.count(ProjectOutcome::Rotated),
        no_permission = summary.count(ProjectOutcome::PermissionDenied),
        "rotation finished"
    );
    for project in summary.rotated() {
        info!(project = %validator.sanitize_log_input(project), "rotated");
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, ConfigError, RotationError, SecurityError};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use tempfile::tempdir;

    fn run_config(api_url: &str, output_dir: PathBuf) -> RunConfig {
        RunConfig {
            api_token: "test-token".to_string(),
            organization: "acme".to_string(),
            vcs: "gh".to_string(),
            project: String::new(),
            config_path: None,
            api_url: Some(api_url.to_string()),
            output_dir: Some(output_dir),
        }
    }

    #[tokio::test]
    async fn test_rotates_rsa_deploy_key_end_to_end() {
        let dir = tempdir().unwrap();
        let mut server = Server::new_async().await;

        let settings = server
            .mock("GET", "/api/v1.1/organization/github/acme/settings")
            .match_header("circle-token", "test-token")
            .with_status(200)
            .with_body(
                json!({"projects": [
                    {"vcs_url": "https://github.com/acme/widgets", "followers": [{"login": "dev"}]}
                ]})
                .to_string(),
            )
            .create_async()
            .await;
        let keys = server
            .mock("GET", "/api/v2/project/github/acme/widgets/checkout-key")
            .with_status(200)
            .with_body(
                json!({"items": [
                    {"type": "deploy-key", "preferred": true, "public_key": "ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQ"}
                ]})
                .to_string(),
            )
            .create_async()
            .await;
        let create = server
            .mock("POST", "/api/v2/project/github/acme/widgets/checkout-key")
            .match_body(Matcher::Json(json!({"type": "deploy-key"})))
            .with_status(201)
            .with_body(r#"{"type": "deploy-key", "preferred": true, "public_key": "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5"}"#)
            .expect(1)
            .create_async()
            .await;

        let summary = handle_rotate_command(run_config(&server.url(), dir.path().to_path_buf()))
            .await
            .unwrap();

        settings.assert_async().await;
        keys.assert_async().await;
        create.assert_async().await;
        assert_eq!(summary.rotated(), vec!["widgets"]);

        let old = std::fs::read_to_string(dir.path().join("old_keys_acme.txt")).unwrap();
        assert_eq!(old.lines().count(), 1);
        assert!(old.contains("ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQ"));

        let new = std::fs::read_to_string(dir.path().join("new_keys_acme.txt")).unwrap();
        assert_eq!(new.lines().count(), 1);
        assert!(new.contains("widgets new prefered key:"));
        assert!(new.contains("ssh-ed25519"));
    }

    #[tokio::test]
    async fn test_single_project_filter() {
        let dir = tempdir().unwrap();
        let mut server = Server::new_async().await;
        let _settings = server
            .mock("GET", "/api/v1.1/organization/github/acme/settings")
            .with_status(200)
            .with_body(std::fs::read_to_string("test_data/project_settings.json").unwrap())
            .create_async()
            .await;
        let widgets = server
            .mock("GET", "/api/v2/project/github/acme/widgets/checkout-key")
            .expect(0)
            .create_async()
            .await;
        let gizmos = server
            .mock("GET", "/api/v2/project/github/acme/gizmos/checkout-key")
            .with_status(200)
            .with_body(std::fs::read_to_string("test_data/checkout_keys_ed25519.json").unwrap())
            .expect(1)
            .create_async()
            .await;

        let mut run = run_config(&server.url(), dir.path().to_path_buf());
        run.project = "gizmos".to_string();
        let summary = handle_rotate_command(run).await.unwrap();

        widgets.assert_async().await;
        gizmos.assert_async().await;
        assert_eq!(
            summary.outcomes(),
            &[("gizmos".to_string(), ProjectOutcome::NotLegacy)]
        );
        assert!(!dir.path().join("old_keys_acme.txt").exists());
    }

    #[tokio::test]
    async fn test_invalid_vcs_fails_before_any_request() {
        let dir = tempdir().unwrap();
        let mut server = Server::new_async().await;
        let any = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let mut run = run_config(&server.url(), dir.path().to_path_buf());
        run.vcs = "gitlab".to_string();
        let result = handle_rotate_command(run).await;

        any.assert_async().await;
        assert!(matches!(
            result,
            Err(AppError::Config(ConfigError::InvalidVcs { ref vcs })) if vcs == "gitlab"
        ));
    }

    #[tokio::test]
    async fn test_invalid_names_fail_before_any_request() {
        let dir = tempdir().unwrap();
        let mut server = Server::new_async().await;
        let any = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let mut run = run_config(&server.url(), dir.path().to_path_buf());
        run.organization = "../acme".to_string();
        assert!(matches!(
            handle_rotate_command(run).await,
            Err(AppError::Security(SecurityError::InputValidationFailed { .. }))
        ));

        let mut run = run_config(&server.url(), dir.path().to_path_buf());
        run.project = "widgets/../../x".to_string();
        assert!(matches!(
            handle_rotate_command(run).await,
            Err(AppError::Security(SecurityError::InputValidationFailed { .. }))
        ));

        let run = run_config("ftp://circleci.com", dir.path().to_path_buf());
        assert!(matches!(
            handle_rotate_command(run).await,
            Err(AppError::Config(ConfigError::ValidationError { .. }))
        ));

        any.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_project_is_fatal() {
        let dir = tempdir().unwrap();
        let mut server = Server::new_async().await;
        let _settings = server
            .mock("GET", "/api/v1.1/organization/github/acme/settings")
            .with_status(200)
            .with_body(r#"{"projects": []}"#)
            .create_async()
            .await;

        let mut run = run_config(&server.url(), dir.path().to_path_buf());
        run.project = "widgets".to_string();
        let result = handle_rotate_command(run).await;

        assert!(matches!(
            result,
            Err(AppError::Rotation(RotationError::ProjectNotFound { .. }))
        ));
    }
}

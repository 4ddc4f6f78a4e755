use crate::client::models::{CheckoutKeyList, NewKeyType, ProjectSettings};
use crate::client::CircleCiClient;
use crate::config::Vcs;
use crate::error::{ClientError, RotationError};
use crate::rotation::recorder::KeyRecorder;
use crate::security::InputValidator;
use reqwest::StatusCode;
use tracing::{debug, info, warn};

/// What happened to a single project during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectOutcome {
    /// Legacy key logged and a replacement created
    Rotated,
    /// First key is not preferred, or is preferred but not `ssh-rsa`
    NotLegacy,
    NoKeys,
    /// Creation answered 403
    PermissionDenied,
}

/// Per-project outcomes in processing order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationSummary {
    outcomes: Vec<(String, ProjectOutcome)>,
}

impl RotationSummary {
    pub fn push(&mut self, project: impl Into<String>, outcome: ProjectOutcome) {
        self.outcomes.push((project.into(), outcome));
    }

    pub fn outcomes(&self) -> &[(String, ProjectOutcome)] {
        &self.outcomes
    }

    pub fn rotated(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| *outcome == ProjectOutcome::Rotated)
            .map(|(project, _)| project.as_str())
            .collect()
    }

    pub fn count(&self, outcome: ProjectOutcome) -> usize {
        self.outcomes.iter().filter(|(_, o)| *o == outcome).count()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Narrow the eligible projects to the requested one, or keep all of them when
/// no filter (or an empty one) is given.
pub fn select_projects(
    eligible: Vec<String>,
    filter: Option<&str>,
) -> Result<Vec<String>, RotationError> {
    match filter {
        Some(project) if !project.is_empty() => {
            if eligible.iter().any(|p| p == project) {
                Ok(vec![project.to_string()])
            } else {
                Err(RotationError::ProjectNotFound {
                    project: project.to_string(),
                })
            }
        }
        _ => Ok(eligible),
    }
}

/// Drives the list → filter → inspect → rotate sequence for one organization
pub struct KeyRotator<R: KeyRecorder> {
    client: CircleCiClient,
    organization: String,
    vcs: Vcs,
    recorder: R,
    validator: InputValidator,
}

impl<R: KeyRecorder> KeyRotator<R> {
    pub fn new(client: CircleCiClient, organization: impl Into<String>, vcs: Vcs, recorder: R) -> Self {
        Self {
            client,
            organization: organization.into(),
            vcs,
            recorder,
            validator: InputValidator::default(),
        }
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    /// Run the whole workflow. The first fatal error aborts; rotations already
    /// performed stay in place.
    pub async fn run(&self, project_filter: Option<&str>) -> Result<RotationSummary, RotationError> {
        let eligible = self.eligible_projects().await?;
        let projects = select_projects(eligible, project_filter)?;
        info!(
            organization = %self.organization,
            vcs = %self.vcs,
            count = projects.len(),
            "checking checkout keys"
        );

        let mut summary = RotationSummary::default();
        for project in projects {
            let outcome = self.process_project(&project).await?;
            summary.push(project, outcome);
        }

        Ok(summary)
    }

    /// Names of followed projects whose VCS URL belongs to the configured organization
    pub async fn eligible_projects(&self) -> Result<Vec<String>, RotationError> {
        let url = self.client.project_settings_url(self.vcs, &self.organization);
        let response = self.client.list_projects(self.vcs, &self.organization).await?;
        if response.error_count() > 0 {
            return Err(RotationError::ProjectListing {
                status: response.status().as_u16(),
                body: response.body().to_string(),
                url,
            });
        }

        // A malformed body decodes to "" and lands here as well
        let body = response.json();
        if body.get("projects").is_none() {
            return Err(RotationError::MissingProjects);
        }

        let settings: ProjectSettings =
            serde_json::from_value(body).map_err(|source| ClientError::MalformedBody {
                context: "organization settings".to_string(),
                source,
            })?;

        let mut eligible = Vec::new();
        for project in &settings.projects {
            let Some((org_name, project_name)) = project.org_and_name() else {
                debug!(
                    vcs_url = %self.validator.sanitize_log_input(&project.vcs_url),
                    "skipping project with unparseable vcs url"
                );
                continue;
            };

            if project.has_followers() && org_name == self.organization {
                eligible.push(project_name.to_string());
            }
        }

        debug!(
            total = settings.projects.len(),
            eligible = eligible.len(),
            "filtered projects"
        );
        Ok(eligible)
    }

    /// Inspect the first checkout key of a project and replace it when it is a
    /// preferred `ssh-rsa` key.
    pub async fn process_project(&self, project: &str) -> Result<ProjectOutcome, RotationError> {
        let display_name = self.validator.sanitize_log_input(project);
        let url = self.client.checkout_key_url(self.vcs, &self.organization, project);

        let response = self
            .client
            .list_checkout_keys(self.vcs, &self.organization, project)
            .await?;
        if response.error_count() > 0 {
            return Err(RotationError::KeyListing {
                status: response.status().as_u16(),
                body: response.body().to_string(),
                url,
            });
        }

        let keys: CheckoutKeyList = response.parse("checkout keys")?;
        let Some(first) = keys.items.first() else {
            debug!(project = %display_name, "no checkout keys");
            return Ok(ProjectOutcome::NoKeys);
        };

        // Only the first key is treated as the preferred one
        if !first.preferred && keys.items.iter().skip(1).any(|k| k.preferred) {
            debug!(
                project = %display_name,
                "first checkout key is not flagged preferred but a later one is"
            );
        }

        if !(first.preferred && first.is_legacy_rsa()) {
            info!("{} prefered key is not ssh-rsa, no action taken.", display_name);
            return Ok(ProjectOutcome::NotLegacy);
        }

        info!("ssh-rsa key found as prefered ssh key for {}", display_name);
        self.recorder
            .record_old_key(&self.organization, project, &response.json().to_string())
            .map_err(|source| RotationError::Record {
                project: project.to_string(),
                source,
            })?;

        let key_type = NewKeyType::replacing(&first.key_type);
        info!(
            project = %display_name,
            key_type = key_type.as_str(),
            "creating replacement checkout key"
        );

        let created = self
            .client
            .create_checkout_key(self.vcs, &self.organization, project, key_type)
            .await?;
        if created.status() == StatusCode::FORBIDDEN {
            warn!(
                "skipping project: {} as unable to create new key. url: {}",
                display_name, url
            );
            return Ok(ProjectOutcome::PermissionDenied);
        }
        if created.error_count() > 0 {
            return Err(RotationError::KeyCreation {
                status: created.status().as_u16(),
                body: created.body().to_string(),
                url,
            });
        }

        self.recorder
            .record_new_key(&self.organization, project, &created.json().to_string())
            .map_err(|source| RotationError::Record {
                project: project.to_string(),
                source,
            })?;

        info!(project = %display_name, "checkout key rotated");
        Ok(ProjectOutcome::Rotated)
    }
}

//! Application workflow.
//!
//! A seeker applies once per job. The job's recruiter moves the
//! application between review states freely; the applicant may withdraw
//! it (a hard delete) only while it is still `PENDING`.

use std::collections::BTreeMap;
use tracing::info;

use crate::api::metrics::record_application_submitted;
use crate::auth::Principal;
use crate::db::{
    timestamp, ApplicationStatus, ApplicationView, ApplyRequest, DbPool, Job, JobApplication,
    UpdateStatusRequest, User,
};
use crate::error::{BoardError, BoardResult};
use crate::notifications::{NotificationEvent, Notifier};

const ALREADY_APPLIED: &str = "You have already applied for this job";

const VIEW_SELECT: &str = r#"
    SELECT a.id, a.job_id, j.title AS job_title, j.company,
           a.applicant_id, u.full_name AS applicant_name, u.email AS applicant_email,
           a.status, a.cover_letter, a.resume_url, a.notes, a.applied_date, a.reviewed_date
    FROM job_applications a
    JOIN jobs j ON j.id = a.job_id
    JOIN users u ON u.id = a.applicant_id
"#;

#[derive(Clone)]
pub struct ApplicationWorkflow {
    db: DbPool,
    notifier: Notifier,
}

impl ApplicationWorkflow {
    pub fn new(db: DbPool, notifier: Notifier) -> Self {
        Self { db, notifier }
    }

    async fn job(&self, job_id: &str) -> BoardResult<Job> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = ?")
            .bind(job_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| BoardError::not_found(format!("Job not found with id: {}", job_id)))
    }

    async fn application(&self, id: &str) -> BoardResult<JobApplication> {
        sqlx::query_as::<_, JobApplication>("SELECT * FROM job_applications WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| {
                BoardError::not_found(format!("Application not found with id: {}", id))
            })
    }

    async fn view(&self, id: &str) -> BoardResult<ApplicationView> {
        sqlx::query_as::<_, ApplicationView>(&format!("{} WHERE a.id = ?", VIEW_SELECT))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| {
                BoardError::not_found(format!("Application not found with id: {}", id))
            })
    }

    pub async fn apply(
        &self,
        job_id: &str,
        applicant: &Principal,
        request: ApplyRequest,
    ) -> BoardResult<ApplicationView> {
        let job = self.job(job_id).await?;
        if !job.is_active {
            return Err(BoardError::invalid_state("Cannot apply for an inactive job"));
        }
        if job.deadline_passed(chrono::Utc::now()) {
            return Err(BoardError::invalid_state("Application deadline has passed"));
        }

        let existing: Option<(String,)> = sqlx::query_as(
            "SELECT id FROM job_applications WHERE job_id = ? AND applicant_id = ?",
        )
        .bind(job_id)
        .bind(&applicant.user_id)
        .fetch_optional(&self.db)
        .await?;
        if existing.is_some() {
            return Err(BoardError::conflict(ALREADY_APPLIED));
        }

        let profile = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(&applicant.user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| BoardError::unauthenticated("Account no longer exists"))?;
        let resume_url = request.resume_url.or(profile.resume_url);

        let id = uuid::Uuid::new_v4().to_string();
        // The UNIQUE(job_id, applicant_id) constraint settles concurrent applies
        sqlx::query(
            r#"
            INSERT INTO job_applications (id, job_id, applicant_id, status, cover_letter,
                                          resume_url, applied_date)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(job_id)
        .bind(&applicant.user_id)
        .bind(ApplicationStatus::Pending)
        .bind(&request.cover_letter)
        .bind(&resume_url)
        .bind(timestamp())
        .execute(&self.db)
        .await
        .map_err(|e| match BoardError::from(e) {
            BoardError::Conflict(_) => BoardError::conflict(ALREADY_APPLIED),
            other => other,
        })?;

        info!(application_id = %id, job_id = %job_id, applicant_id = %applicant.user_id, "Application submitted");
        record_application_submitted();

        self.notifier.notify(NotificationEvent::ApplicationReceived {
            application_id: id.clone(),
            job_id: job.id.clone(),
            job_title: job.title.clone(),
            recruiter_id: job.posted_by.clone(),
            applicant_name: profile.full_name,
        });
        self.view(&id).await
    }

    pub async fn list_for_job(
        &self,
        job_id: &str,
        recruiter: &Principal,
    ) -> BoardResult<Vec<ApplicationView>> {
        let job = self.job(job_id).await?;
        if !job.is_owned_by(&recruiter.user_id) {
            return Err(BoardError::forbidden(
                "You are not authorized to view applications for this job",
            ));
        }
        let views = sqlx::query_as::<_, ApplicationView>(&format!(
            "{} WHERE a.job_id = ? ORDER BY a.applied_date DESC",
            VIEW_SELECT
        ))
        .bind(job_id)
        .fetch_all(&self.db)
        .await?;
        Ok(views)
    }

    pub async fn list_for_applicant(
        &self,
        applicant: &Principal,
    ) -> BoardResult<Vec<ApplicationView>> {
        let views = sqlx::query_as::<_, ApplicationView>(&format!(
            "{} WHERE a.applicant_id = ? ORDER BY a.applied_date DESC",
            VIEW_SELECT
        ))
        .bind(&applicant.user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(views)
    }

    /// Readable by the applicant and by the recruiter who owns the job
    pub async fn get_for_viewer(&self, id: &str, viewer: &Principal) -> BoardResult<ApplicationView> {
        let view = self.view(id).await?;
        if view.applicant_id == viewer.user_id {
            return Ok(view);
        }
        let job = self.job(&view.job_id).await?;
        if !job.is_owned_by(&viewer.user_id) {
            return Err(BoardError::forbidden(
                "You are not authorized to view this application",
            ));
        }
        Ok(view)
    }

    pub async fn update_status(
        &self,
        id: &str,
        request: UpdateStatusRequest,
        recruiter: &Principal,
    ) -> BoardResult<ApplicationView> {
        let application = self.application(id).await?;
        let job = self.job(&application.job_id).await?;
        if !job.is_owned_by(&recruiter.user_id) {
            return Err(BoardError::forbidden(
                "You are not authorized to update this application",
            ));
        }

        sqlx::query(
            "UPDATE job_applications SET status = ?, notes = ?, reviewed_date = ? WHERE id = ?",
        )
        .bind(request.status)
        .bind(&request.notes)
        .bind(timestamp())
        .bind(id)
        .execute(&self.db)
        .await?;

        info!(application_id = %id, status = %request.status, "Application status updated");
        self.notifier.notify(NotificationEvent::ApplicationStatusChanged {
            application_id: application.id.clone(),
            job_id: job.id.clone(),
            job_title: job.title.clone(),
            applicant_id: application.applicant_id.clone(),
            status: request.status,
        });
        self.view(id).await
    }

    pub async fn withdraw(&self, id: &str, applicant: &Principal) -> BoardResult<()> {
        let application = self.application(id).await?;
        if application.applicant_id != applicant.user_id {
            return Err(BoardError::forbidden(
                "You are not authorized to withdraw this application",
            ));
        }
        if application.status != ApplicationStatus::Pending {
            return Err(BoardError::invalid_state(
                "Cannot withdraw application after it has been reviewed",
            ));
        }

        // Guarded on status so a concurrent review wins
        let result = sqlx::query("DELETE FROM job_applications WHERE id = ? AND status = ?")
            .bind(id)
            .bind(ApplicationStatus::Pending)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BoardError::invalid_state(
                "Cannot withdraw application after it has been reviewed",
            ));
        }
        info!(application_id = %id, "Application withdrawn");
        Ok(())
    }

    pub async fn count_by_status(&self, job_id: &str, status: ApplicationStatus) -> BoardResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM job_applications WHERE job_id = ? AND status = ?",
        )
        .bind(job_id)
        .bind(status)
        .fetch_one(&self.db)
        .await?;
        Ok(count)
    }

    pub async fn count_total(&self, job_id: &str) -> BoardResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM job_applications WHERE job_id = ?")
            .bind(job_id)
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    pub async fn count_all(&self) -> BoardResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM job_applications")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    /// Per-status counts for a job plus `TOTAL`, for the owning recruiter
    pub async fn stats(
        &self,
        job_id: &str,
        recruiter: &Principal,
    ) -> BoardResult<BTreeMap<String, i64>> {
        let job = self.job(job_id).await?;
        if !job.is_owned_by(&recruiter.user_id) {
            return Err(BoardError::forbidden(
                "You are not authorized to view applications for this job",
            ));
        }

        let mut stats = BTreeMap::new();
        for status in ApplicationStatus::ALL {
            stats.insert(status.to_string(), self.count_by_status(job_id, status).await?);
        }
        stats.insert("TOTAL".to_string(), self.count_total(job_id).await?);
        Ok(stats)
    }
}

//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity. Every
//! read-modify-write on a question (review transitions, resets, moves,
//! synonym merges) runs inside one transaction so a store failure leaves
//! prior state unmodified.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    CreateLeitnerRequest, CreateLevelRequest, CreateQuestionRequest, CreateTagRequest, Leitner,
    Level, LevelPlan, Question, Statistic, SynonymGroup, Tag, UpdateLeitnerRequest,
    UpdateQuestionRequest, UpdateTagRequest,
};
use crate::scheduling::{self, ReviewOutcome};

/// Shared SELECT for questions; the owning level is joined in for the
/// denormalized `leitner_id` and `level_number` fields.
const QUESTION_SELECT: &str = r#"SELECT q.id, q.level_id, q.question, q.answer, q.detail,
              q.completed, q.favorite, q.pass_time, q.created_at,
              l.level_number, l.leitner_id
       FROM questions q
       JOIN levels l ON q.level_id = l.id"#;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// Increment the revision ID and return the new value.
    pub async fn increment_revision(&self) -> Result<i64, AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&self.pool)
            .await?;
        self.get_revision_id().await
    }

    // ==================== LEITNER OPERATIONS ====================

    /// List all leitners.
    pub async fn list_leitners(&self) -> Result<Vec<Leitner>, AppError> {
        let rows = sqlx::query(
            "SELECT id, name, back_to_top_level_on_fail, created_at FROM leitners ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(leitner_from_row).collect())
    }

    /// Get a leitner by ID.
    pub async fn get_leitner(&self, id: &str) -> Result<Option<Leitner>, AppError> {
        let row = sqlx::query(
            "SELECT id, name, back_to_top_level_on_fail, created_at FROM leitners WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(leitner_from_row))
    }

    /// Create a new leitner together with its level plan.
    ///
    /// The plan must contain level 1 (the default insertion point) and
    /// is validated before anything is written.
    pub async fn create_leitner(&self, request: &CreateLeitnerRequest) -> Result<Leitner, AppError> {
        let plan = match &request.levels {
            Some(levels) => levels.clone(),
            None => default_level_plan(),
        };
        validate_level_plan(&plan)?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let now_str = now.to_rfc3339();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO leitners (id, name, back_to_top_level_on_fail, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&request.name)
        .bind(request.back_to_top_level_on_fail as i32)
        .bind(&now_str)
        .execute(&mut *tx)
        .await?;

        for level in &plan {
            sqlx::query(
                "INSERT INTO levels (id, leitner_id, level_number, days_to_recommend) VALUES (?, ?, ?, ?)",
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(&id)
            .bind(level.level_number)
            .bind(level.days_to_recommend)
            .execute(&mut *tx)
            .await?;
        }

        increment_revision_tx(&mut tx).await?;
        tx.commit().await?;

        Ok(Leitner {
            id,
            name: request.name.clone(),
            back_to_top_level_on_fail: request.back_to_top_level_on_fail,
            created_at: now,
        })
    }

    /// Update a leitner's name or fail policy.
    pub async fn update_leitner(
        &self,
        id: &str,
        request: &UpdateLeitnerRequest,
    ) -> Result<Leitner, AppError> {
        let existing = self
            .get_leitner(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Leitner {} not found", id)))?;

        let name = request.name.as_ref().unwrap_or(&existing.name);
        let back_to_top = request
            .back_to_top_level_on_fail
            .unwrap_or(existing.back_to_top_level_on_fail);

        sqlx::query("UPDATE leitners SET name = ?, back_to_top_level_on_fail = ? WHERE id = ?")
            .bind(name)
            .bind(back_to_top as i32)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.increment_revision().await?;

        Ok(Leitner {
            id: id.to_string(),
            name: name.clone(),
            back_to_top_level_on_fail: back_to_top,
            created_at: existing.created_at,
        })
    }

    /// Delete a leitner; levels, questions, tags and statistics cascade.
    pub async fn delete_leitner(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM leitners WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Leitner {} not found", id)));
        }

        prune_synonym_groups(&mut tx).await?;
        increment_revision_tx(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    // ==================== LEVEL OPERATIONS ====================

    /// List a leitner's levels ordered by level number.
    pub async fn list_levels(&self, leitner_id: &str) -> Result<Vec<Level>, AppError> {
        let rows = sqlx::query(
            "SELECT id, leitner_id, level_number, days_to_recommend FROM levels WHERE leitner_id = ? ORDER BY level_number",
        )
        .bind(leitner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(level_from_row).collect())
    }

    /// Get a level by ID.
    pub async fn get_level(&self, id: &str) -> Result<Option<Level>, AppError> {
        let row = sqlx::query(
            "SELECT id, leitner_id, level_number, days_to_recommend FROM levels WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(level_from_row))
    }

    /// Add a level to a leitner. Level numbers are unique per leitner.
    pub async fn create_level(
        &self,
        leitner_id: &str,
        request: &CreateLevelRequest,
    ) -> Result<Level, AppError> {
        scheduling::validate_days_to_recommend(request.days_to_recommend)?;
        if request.level_number < scheduling::FIRST_LEVEL {
            return Err(AppError::Validation(format!(
                "levelNumber must be at least {}, got {}",
                scheduling::FIRST_LEVEL,
                request.level_number
            )));
        }

        self.get_leitner(leitner_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Leitner {} not found", leitner_id)))?;

        let duplicate =
            sqlx::query("SELECT id FROM levels WHERE leitner_id = ? AND level_number = ?")
                .bind(leitner_id)
                .bind(request.level_number)
                .fetch_optional(&self.pool)
                .await?;
        if duplicate.is_some() {
            return Err(AppError::Validation(format!(
                "Level {} already exists in this leitner",
                request.level_number
            )));
        }

        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO levels (id, leitner_id, level_number, days_to_recommend) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(leitner_id)
        .bind(request.level_number)
        .bind(request.days_to_recommend)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(Level {
            id,
            leitner_id: leitner_id.to_string(),
            level_number: request.level_number,
            days_to_recommend: request.days_to_recommend,
        })
    }

    /// Change a level's review interval. The interval is validated
    /// before any write.
    pub async fn set_days_to_recommend(&self, id: &str, days: i64) -> Result<Level, AppError> {
        scheduling::validate_days_to_recommend(days)?;

        let existing = self
            .get_level(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Level {} not found", id)))?;

        sqlx::query("UPDATE levels SET days_to_recommend = ? WHERE id = ?")
            .bind(days)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.increment_revision().await?;

        Ok(Level {
            days_to_recommend: days,
            ..existing
        })
    }

    // ==================== QUESTION OPERATIONS ====================

    /// List every question in a leitner, ordered by ascending pass time
    /// with never-passed questions first.
    pub async fn list_questions(&self, leitner_id: &str) -> Result<Vec<Question>, AppError> {
        let sql = format!(
            "{} WHERE l.leitner_id = ? ORDER BY q.pass_time ASC, q.created_at ASC",
            QUESTION_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(leitner_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(question_from_row).collect())
    }

    /// List the questions sitting in one level, in the same order as
    /// [`Repository::list_questions`].
    pub async fn questions_in_level(&self, level_id: &str) -> Result<Vec<Question>, AppError> {
        let sql = format!(
            "{} WHERE q.level_id = ? ORDER BY q.pass_time ASC, q.created_at ASC",
            QUESTION_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(level_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(question_from_row).collect())
    }

    /// Get a question by ID.
    pub async fn get_question(&self, id: &str) -> Result<Option<Question>, AppError> {
        let sql = format!("{} WHERE q.id = ?", QUESTION_SELECT);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;

        Ok(row.as_ref().map(question_from_row))
    }

    /// Create a new question at level 1 of the given leitner.
    pub async fn create_question(
        &self,
        leitner_id: &str,
        request: &CreateQuestionRequest,
    ) -> Result<Question, AppError> {
        self.get_leitner(leitner_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Leitner {} not found", leitner_id)))?;

        let levels = self.list_levels(leitner_id).await?;
        let (level_id, level_number) = scheduling::plan_reset(&levels)?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO questions (id, level_id, question, answer, detail, completed, favorite, pass_time, created_at) VALUES (?, ?, ?, ?, ?, 0, ?, NULL, ?)",
        )
        .bind(&id)
        .bind(&level_id)
        .bind(&request.question)
        .bind(&request.answer)
        .bind(&request.detail)
        .bind(request.favorite as i32)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(Question {
            id,
            leitner_id: leitner_id.to_string(),
            level_id,
            level_number,
            question: request.question.clone(),
            answer: request.answer.clone(),
            detail: request.detail.clone(),
            completed: false,
            favorite: request.favorite,
            pass_time: None,
            created_at: now,
        })
    }

    /// Update a question's text fields and flags.
    pub async fn update_question(
        &self,
        id: &str,
        request: &UpdateQuestionRequest,
    ) -> Result<Question, AppError> {
        let existing = self
            .get_question(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Question {} not found", id)))?;

        let question = request
            .question
            .clone()
            .unwrap_or_else(|| existing.question.clone());
        let answer = request
            .answer
            .clone()
            .unwrap_or_else(|| existing.answer.clone());
        let detail = request.detail.clone().or(existing.detail.clone());
        let favorite = request.favorite.unwrap_or(existing.favorite);
        let completed = request.completed.unwrap_or(existing.completed);

        sqlx::query(
            "UPDATE questions SET question = ?, answer = ?, detail = ?, favorite = ?, completed = ? WHERE id = ?",
        )
        .bind(&question)
        .bind(&answer)
        .bind(&detail)
        .bind(favorite as i32)
        .bind(completed as i32)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(Question {
            question,
            answer,
            detail,
            favorite,
            completed,
            ..existing
        })
    }

    /// Delete a question; its statistics, tag links and synonym
    /// membership cascade, and groups left with fewer than two members
    /// are pruned.
    pub async fn delete_question(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM questions WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Question {} not found", id)));
        }

        prune_synonym_groups(&mut tx).await?;
        increment_revision_tx(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Apply a pass/fail review transition atomically: compute the
    /// destination level, move the question and append the statistic in
    /// one transaction.
    pub async fn apply_review(
        &self,
        question_id: &str,
        outcome: ReviewOutcome,
        now: DateTime<Utc>,
    ) -> Result<Question, AppError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("{} WHERE q.id = ?", QUESTION_SELECT);
        let row = sqlx::query(&sql)
            .bind(question_id)
            .fetch_optional(&mut *tx)
            .await?;
        let question = row
            .as_ref()
            .map(question_from_row)
            .ok_or_else(|| AppError::NotFound(format!("Question {} not found", question_id)))?;

        let leitner_row =
            sqlx::query("SELECT back_to_top_level_on_fail FROM leitners WHERE id = ?")
                .bind(&question.leitner_id)
                .fetch_one(&mut *tx)
                .await?;
        let back_to_top: i32 = leitner_row.get("back_to_top_level_on_fail");

        let level_rows = sqlx::query(
            "SELECT id, leitner_id, level_number, days_to_recommend FROM levels WHERE leitner_id = ? ORDER BY level_number",
        )
        .bind(&question.leitner_id)
        .fetch_all(&mut *tx)
        .await?;
        let levels: Vec<Level> = level_rows.iter().map(level_from_row).collect();

        let plan = scheduling::plan_review(&question, &levels, back_to_top != 0, outcome, now)?;
        let pass_time = plan.pass_time.or(question.pass_time);

        sqlx::query("UPDATE questions SET level_id = ?, completed = ?, pass_time = ? WHERE id = ?")
            .bind(&plan.destination_level_id)
            .bind(plan.completed as i32)
            .bind(pass_time.map(|t| t.to_rfc3339()))
            .bind(question_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO statistics (id, question_id, is_passed, action_date) VALUES (?, ?, ?, ?)",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(question_id)
        .bind(plan.is_passed as i32)
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        increment_revision_tx(&mut tx).await?;
        tx.commit().await?;

        Ok(Question {
            level_id: plan.destination_level_id,
            level_number: plan.destination_level_number,
            completed: plan.completed,
            pass_time,
            ..question
        })
    }

    /// Manually reset a question to level 1. No statistic is recorded.
    pub async fn reset_question(&self, id: &str) -> Result<Question, AppError> {
        let question = self
            .get_question(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Question {} not found", id)))?;

        let levels = self.list_levels(&question.leitner_id).await?;
        let (level_id, level_number) = scheduling::plan_reset(&levels)?;

        sqlx::query("UPDATE questions SET level_id = ?, completed = 0 WHERE id = ?")
            .bind(&level_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.increment_revision().await?;

        Ok(Question {
            level_id,
            level_number,
            completed: false,
            ..question
        })
    }

    /// Move a question to another leitner. The question re-enters at
    /// level 1 of the destination; a destination without a level 1 is a
    /// validation error and nothing is written.
    pub async fn move_question(
        &self,
        id: &str,
        target_leitner_id: &str,
    ) -> Result<Question, AppError> {
        let question = self
            .get_question(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Question {} not found", id)))?;

        self.get_leitner(target_leitner_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("Leitner {} not found", target_leitner_id))
        })?;

        let levels = self.list_levels(target_leitner_id).await?;
        let (level_id, level_number) = scheduling::plan_reset(&levels)?;

        sqlx::query("UPDATE questions SET level_id = ?, completed = 0 WHERE id = ?")
            .bind(&level_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.increment_revision().await?;

        Ok(Question {
            leitner_id: target_leitner_id.to_string(),
            level_id,
            level_number,
            completed: false,
            ..question
        })
    }

    // ==================== TAG OPERATIONS ====================

    /// List a leitner's tags.
    pub async fn list_tags(&self, leitner_id: &str) -> Result<Vec<Tag>, AppError> {
        let rows = sqlx::query(
            "SELECT id, leitner_id, name, color, created_at FROM tags WHERE leitner_id = ? ORDER BY name",
        )
        .bind(leitner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(tag_from_row).collect())
    }

    /// Get a tag by ID.
    pub async fn get_tag(&self, id: &str) -> Result<Option<Tag>, AppError> {
        let row =
            sqlx::query("SELECT id, leitner_id, name, color, created_at FROM tags WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.as_ref().map(tag_from_row))
    }

    /// Create a new tag scoped to a leitner.
    pub async fn create_tag(
        &self,
        leitner_id: &str,
        request: &CreateTagRequest,
    ) -> Result<Tag, AppError> {
        self.get_leitner(leitner_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Leitner {} not found", leitner_id)))?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO tags (id, leitner_id, name, color, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(leitner_id)
        .bind(&request.name)
        .bind(&request.color)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(Tag {
            id,
            leitner_id: leitner_id.to_string(),
            name: request.name.clone(),
            color: request.color.clone(),
            created_at: now,
        })
    }

    /// Update a tag.
    pub async fn update_tag(&self, id: &str, request: &UpdateTagRequest) -> Result<Tag, AppError> {
        let existing = self
            .get_tag(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tag {} not found", id)))?;

        let name = request.name.as_ref().unwrap_or(&existing.name);
        let color = request.color.clone().or(existing.color.clone());

        sqlx::query("UPDATE tags SET name = ?, color = ? WHERE id = ?")
            .bind(name)
            .bind(&color)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.increment_revision().await?;

        Ok(Tag {
            id: id.to_string(),
            leitner_id: existing.leitner_id,
            name: name.clone(),
            color,
            created_at: existing.created_at,
        })
    }

    /// Delete a tag; question links cascade.
    pub async fn delete_tag(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Tag {} not found", id)));
        }

        self.increment_revision().await?;
        Ok(())
    }

    /// List the tags attached to one question.
    pub async fn tags_for_question(&self, question_id: &str) -> Result<Vec<Tag>, AppError> {
        let rows = sqlx::query(
            r#"SELECT t.id, t.leitner_id, t.name, t.color, t.created_at
               FROM tags t
               JOIN question_tags qt ON qt.tag_id = t.id
               WHERE qt.question_id = ?
               ORDER BY t.name"#,
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(tag_from_row).collect())
    }

    /// Attach a tag to a question. Both must belong to the same leitner.
    pub async fn attach_tag(&self, question_id: &str, tag_id: &str) -> Result<(), AppError> {
        let question = self
            .get_question(question_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Question {} not found", question_id)))?;
        let tag = self
            .get_tag(tag_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tag {} not found", tag_id)))?;

        if question.leitner_id != tag.leitner_id {
            return Err(AppError::Validation(
                "Tag and question belong to different leitners".to_string(),
            ));
        }

        let result =
            sqlx::query("INSERT OR IGNORE INTO question_tags (question_id, tag_id) VALUES (?, ?)")
                .bind(question_id)
                .bind(tag_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() > 0 {
            self.increment_revision().await?;
        }
        Ok(())
    }

    /// Detach a tag from a question.
    pub async fn detach_tag(&self, question_id: &str, tag_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM question_tags WHERE question_id = ? AND tag_id = ?")
            .bind(question_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Question {} does not carry tag {}",
                question_id, tag_id
            )));
        }

        self.increment_revision().await?;
        Ok(())
    }

    // ==================== SYNONYM OPERATIONS ====================

    /// List the synonym groups that have at least one member inside the
    /// given leitner.
    pub async fn list_synonym_groups(
        &self,
        leitner_id: &str,
    ) -> Result<Vec<SynonymGroup>, AppError> {
        let rows = sqlx::query(
            r#"SELECT sm.synonym_id, sm.question_id
               FROM synonym_members sm
               WHERE sm.synonym_id IN (
                   SELECT sm2.synonym_id
                   FROM synonym_members sm2
                   JOIN questions q ON q.id = sm2.question_id
                   JOIN levels l ON l.id = q.level_id
                   WHERE l.leitner_id = ?
               )
               ORDER BY sm.synonym_id, sm.question_id"#,
        )
        .bind(leitner_id)
        .fetch_all(&self.pool)
        .await?;

        let mut groups: Vec<SynonymGroup> = Vec::new();
        for row in rows {
            let synonym_id: String = row.get("synonym_id");
            let question_id: String = row.get("question_id");
            match groups.last_mut() {
                Some(group) if group.id == synonym_id => group.question_ids.push(question_id),
                _ => groups.push(SynonymGroup {
                    id: synonym_id,
                    question_ids: vec![question_id],
                }),
            }
        }
        Ok(groups)
    }

    /// Get the synonym group a question belongs to, if any.
    pub async fn synonym_group_of(
        &self,
        question_id: &str,
    ) -> Result<Option<SynonymGroup>, AppError> {
        let row = sqlx::query("SELECT synonym_id FROM synonym_members WHERE question_id = ?")
            .bind(question_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let synonym_id: String = row.get("synonym_id");

        let members = sqlx::query(
            "SELECT question_id FROM synonym_members WHERE synonym_id = ? ORDER BY question_id",
        )
        .bind(&synonym_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(SynonymGroup {
            id: synonym_id,
            question_ids: members.iter().map(|r| r.get("question_id")).collect(),
        }))
    }

    /// Link two questions as synonyms.
    ///
    /// Creates a group when neither question has one, joins the existing
    /// group when only one side has one, and merges two groups into the
    /// one with the smaller ID when both sides are already grouped.
    pub async fn link_synonyms(
        &self,
        question_id: &str,
        other_question_id: &str,
    ) -> Result<SynonymGroup, AppError> {
        if question_id == other_question_id {
            return Err(AppError::Validation(
                "Cannot link a question to itself".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        for id in [question_id, other_question_id] {
            let exists = sqlx::query("SELECT id FROM questions WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
            if exists.is_none() {
                return Err(AppError::NotFound(format!("Question {} not found", id)));
            }
        }

        let group_a = member_group_tx(&mut tx, question_id).await?;
        let group_b = member_group_tx(&mut tx, other_question_id).await?;

        let group_id = match (group_a, group_b) {
            (None, None) => {
                let group_id = uuid::Uuid::new_v4().to_string();
                sqlx::query("INSERT INTO synonyms (id, created_at) VALUES (?, ?)")
                    .bind(&group_id)
                    .bind(Utc::now().to_rfc3339())
                    .execute(&mut *tx)
                    .await?;
                for id in [question_id, other_question_id] {
                    sqlx::query(
                        "INSERT INTO synonym_members (question_id, synonym_id) VALUES (?, ?)",
                    )
                    .bind(id)
                    .bind(&group_id)
                    .execute(&mut *tx)
                    .await?;
                }
                group_id
            }
            (Some(group), None) => {
                sqlx::query("INSERT INTO synonym_members (question_id, synonym_id) VALUES (?, ?)")
                    .bind(other_question_id)
                    .bind(&group)
                    .execute(&mut *tx)
                    .await?;
                group
            }
            (None, Some(group)) => {
                sqlx::query("INSERT INTO synonym_members (question_id, synonym_id) VALUES (?, ?)")
                    .bind(question_id)
                    .bind(&group)
                    .execute(&mut *tx)
                    .await?;
                group
            }
            (Some(group_a), Some(group_b)) if group_a == group_b => group_a,
            (Some(group_a), Some(group_b)) => {
                // Merge rule: the smaller group ID wins.
                let (keep, drop) = if group_a < group_b {
                    (group_a, group_b)
                } else {
                    (group_b, group_a)
                };
                sqlx::query("UPDATE synonym_members SET synonym_id = ? WHERE synonym_id = ?")
                    .bind(&keep)
                    .bind(&drop)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query("DELETE FROM synonyms WHERE id = ?")
                    .bind(&drop)
                    .execute(&mut *tx)
                    .await?;
                keep
            }
        };

        let members = sqlx::query(
            "SELECT question_id FROM synonym_members WHERE synonym_id = ? ORDER BY question_id",
        )
        .bind(&group_id)
        .fetch_all(&mut *tx)
        .await?;
        let question_ids: Vec<String> = members.iter().map(|r| r.get("question_id")).collect();

        increment_revision_tx(&mut tx).await?;
        tx.commit().await?;

        Ok(SynonymGroup {
            id: group_id,
            question_ids,
        })
    }

    /// Detach a question from its synonym group; a group left with a
    /// single member is dissolved.
    pub async fn unlink_synonyms(&self, question_id: &str) -> Result<(), AppError> {
        self.get_question(question_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Question {} not found", question_id)))?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM synonym_members WHERE question_id = ?")
            .bind(question_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() > 0 {
            prune_synonym_groups(&mut tx).await?;
            increment_revision_tx(&mut tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    // ==================== STATISTIC OPERATIONS ====================

    /// List every statistic, oldest first.
    pub async fn list_statistics(&self) -> Result<Vec<Statistic>, AppError> {
        let rows = sqlx::query(
            "SELECT id, question_id, is_passed, action_date FROM statistics ORDER BY action_date ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(statistic_from_row).collect())
    }
}

// Helper functions for transactional bookkeeping

async fn increment_revision_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
) -> Result<(), AppError> {
    let now = Utc::now().to_rfc3339();
    sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
        .bind(&now)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn member_group_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    question_id: &str,
) -> Result<Option<String>, AppError> {
    let row = sqlx::query("SELECT synonym_id FROM synonym_members WHERE question_id = ?")
        .bind(question_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.map(|r| r.get("synonym_id")))
}

/// Dissolve groups that no longer link at least two questions.
async fn prune_synonym_groups(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"DELETE FROM synonym_members WHERE synonym_id IN (
               SELECT synonym_id FROM synonym_members GROUP BY synonym_id HAVING COUNT(*) < 2
           )"#,
    )
    .execute(&mut **tx)
    .await?;

    sqlx::query(
        "DELETE FROM synonyms WHERE id NOT IN (SELECT DISTINCT synonym_id FROM synonym_members)",
    )
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// Helper functions for row conversion

fn leitner_from_row(row: &sqlx::sqlite::SqliteRow) -> Leitner {
    let back_to_top: i32 = row.get("back_to_top_level_on_fail");
    let created_at: String = row.get("created_at");
    Leitner {
        id: row.get("id"),
        name: row.get("name"),
        back_to_top_level_on_fail: back_to_top != 0,
        created_at: parse_timestamp(&created_at),
    }
}

fn level_from_row(row: &sqlx::sqlite::SqliteRow) -> Level {
    Level {
        id: row.get("id"),
        leitner_id: row.get("leitner_id"),
        level_number: row.get("level_number"),
        days_to_recommend: row.get("days_to_recommend"),
    }
}

fn question_from_row(row: &sqlx::sqlite::SqliteRow) -> Question {
    let completed: i32 = row.get("completed");
    let favorite: i32 = row.get("favorite");
    let pass_time: Option<String> = row.get("pass_time");
    let created_at: String = row.get("created_at");
    Question {
        id: row.get("id"),
        leitner_id: row.get("leitner_id"),
        level_id: row.get("level_id"),
        level_number: row.get("level_number"),
        question: row.get("question"),
        answer: row.get("answer"),
        detail: row.get("detail"),
        completed: completed != 0,
        favorite: favorite != 0,
        pass_time: pass_time.as_deref().map(parse_timestamp),
        created_at: parse_timestamp(&created_at),
    }
}

fn tag_from_row(row: &sqlx::sqlite::SqliteRow) -> Tag {
    let created_at: String = row.get("created_at");
    Tag {
        id: row.get("id"),
        leitner_id: row.get("leitner_id"),
        name: row.get("name"),
        color: row.get("color"),
        created_at: parse_timestamp(&created_at),
    }
}

fn statistic_from_row(row: &sqlx::sqlite::SqliteRow) -> Statistic {
    let is_passed: i32 = row.get("is_passed");
    let action_date: String = row.get("action_date");
    Statistic {
        id: row.get("id"),
        question_id: row.get("question_id"),
        is_passed: is_passed != 0,
        action_date: parse_timestamp(&action_date),
    }
}

/// The default plan for a leitner created without an explicit one:
/// five boxes with doubling intervals.
fn default_level_plan() -> Vec<LevelPlan> {
    (1..=5)
        .map(|n| LevelPlan {
            level_number: n,
            days_to_recommend: 1 << (n - 1),
        })
        .collect()
}

fn validate_level_plan(plan: &[LevelPlan]) -> Result<(), AppError> {
    if plan.is_empty() {
        return Err(AppError::Validation(
            "Level plan must contain at least one level".to_string(),
        ));
    }
    let mut seen = std::collections::HashSet::new();
    for level in plan {
        if level.level_number < scheduling::FIRST_LEVEL {
            return Err(AppError::Validation(format!(
                "levelNumber must be at least {}, got {}",
                scheduling::FIRST_LEVEL,
                level.level_number
            )));
        }
        if !seen.insert(level.level_number) {
            return Err(AppError::Validation(format!(
                "Duplicate level number {} in plan",
                level.level_number
            )));
        }
        scheduling::validate_days_to_recommend(level.days_to_recommend)?;
    }
    if !seen.contains(&scheduling::FIRST_LEVEL) {
        return Err(AppError::Validation(
            "Level plan must contain level 1".to_string(),
        ));
    }
    Ok(())
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

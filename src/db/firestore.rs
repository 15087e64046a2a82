// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Groups and memberships (balances live on the membership document)
//! - Activities
//! - Submissions and their daily slots
//! - Reviews
//!
//! Votes, submission slots, member removal and activity deletion run inside
//! `run_transaction`, which retries the whole closure when a concurrent
//! transaction touched the same documents.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use firestore::errors::{BackoffError, FirestoreError};
use futures_util::{stream, FutureExt, StreamExt};
use serde::{Deserialize, Serialize};

use crate::db::{
    collections, plan_slot, plan_vote, ActivityDeletion, MembershipRemoval, ReviewOutcome, Store,
    SubmissionInsert,
};
use crate::error::{AppError, Result};
use crate::models::{
    group, ledger, Activity, Group, LedgerEntry, Membership, Proof, Review, Submission,
    SubmissionStatus,
};
use crate::time_utils::{format_utc_rfc3339, parse_day_key, parse_utc_rfc3339};

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

fn db_err(e: FirestoreError) -> AppError {
    AppError::Database(e.to_string())
}

/// Errors inside a transaction closure abort the transaction.
fn tx_err(e: FirestoreError) -> BackoffError<AppError> {
    BackoffError::Permanent(db_err(e))
}

// ─── Document Shapes ─────────────────────────────────────────────

/// Stored form of a [`Submission`].
///
/// Proofs and tagged users are kept as JSON-encoded strings, and the day and
/// creation time as strings, so the document stays flat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionDoc {
    pub id: String,
    pub activity_id: String,
    pub group_id: String,
    pub user_id: u64,
    pub day: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub proofs: String,
    #[serde(default)]
    pub tagged_users: String,
    pub status: SubmissionStatus,
    #[serde(default)]
    pub credited: bool,
    pub created_at: String,
}

impl SubmissionDoc {
    pub fn from_submission(submission: &Submission) -> Result<Self> {
        let encode = |e: serde_json::Error| {
            AppError::Internal(anyhow::anyhow!("Failed to encode submission: {}", e))
        };

        Ok(Self {
            id: submission.id.clone(),
            activity_id: submission.activity_id.clone(),
            group_id: submission.group_id.clone(),
            user_id: submission.user_id,
            day: submission.day.format("%Y-%m-%d").to_string(),
            description: submission.description.clone(),
            proofs: serde_json::to_string(&submission.proofs).map_err(encode)?,
            tagged_users: serde_json::to_string(&submission.tagged_users).map_err(encode)?,
            status: submission.status,
            credited: submission.credited,
            created_at: format_utc_rfc3339(submission.created_at),
        })
    }
}

fn decode_list<T: serde::de::DeserializeOwned>(raw: &str, field: &str, id: &str) -> Result<Vec<T>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw).map_err(|e| {
        AppError::Database(format!("Submission {} has malformed {}: {}", id, field, e))
    })
}

impl TryFrom<SubmissionDoc> for Submission {
    type Error = AppError;

    fn try_from(doc: SubmissionDoc) -> Result<Self> {
        let proofs: Vec<Proof> = decode_list(&doc.proofs, "proofs", &doc.id)?;
        let tagged_users: Vec<u64> = decode_list(&doc.tagged_users, "tagged_users", &doc.id)?;
        let day = parse_day_key(&doc.day)
            .map_err(|_| AppError::Database(format!("Submission {} has bad day", doc.id)))?;

        Ok(Submission {
            id: doc.id,
            activity_id: doc.activity_id,
            group_id: doc.group_id,
            user_id: doc.user_id,
            day,
            description: doc.description,
            proofs,
            tagged_users,
            status: doc.status,
            credited: doc.credited,
            created_at: parse_utc_rfc3339(&doc.created_at)?,
        })
    }
}

fn decode_submissions(docs: Vec<SubmissionDoc>) -> Result<Vec<Submission>> {
    docs.into_iter().map(Submission::try_from).collect()
}

/// Marker document for one (activity, user, day).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SlotDoc {
    submission_id: String,
}

// ─── Client ──────────────────────────────────────────────────────

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client. Every operation returns a database error.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Helper Methods ────────────────────────────────────────────

    async fn get_doc<T>(&self, collection: &str, id: &str) -> Result<Option<T>>
    where
        T: serde::de::DeserializeOwned + Send,
    {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(db_err)
    }

    async fn set_doc<T>(&self, collection: &str, id: &str, object: &T) -> Result<()>
    where
        T: Serialize + serde::de::DeserializeOwned + Sync + Send,
    {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(object)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn query_submissions(&self, field: &str, value: &str) -> Result<Vec<Submission>> {
        let docs: Vec<SubmissionDoc> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::SUBMISSIONS)
            .filter(|q| q.for_all([q.field(field).eq(value)]))
            .obj()
            .query()
            .await
            .map_err(db_err)?;
        decode_submissions(docs)
    }

    /// Helper to batch delete documents by ID using transactions.
    async fn batch_delete(&self, doc_ids: &[String], collection: &str) -> Result<()> {
        let client = self.get_client()?;

        for chunk in doc_ids.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for doc_id in chunk {
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }
}

#[async_trait]
impl Store for FirestoreDb {
    // ─── Group & Membership Operations ───────────────────────────

    async fn create_group(&self, group: &Group, founder: &Membership) -> Result<()> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::GROUPS)
            .document_id(&group.id)
            .object(group)
            .add_to_transaction(&mut transaction)
            .map_err(db_err)?;

        client
            .fluent()
            .update()
            .in_col(collections::MEMBERSHIPS)
            .document_id(Membership::doc_id(&founder.group_id, founder.user_id))
            .object(founder)
            .add_to_transaction(&mut transaction)
            .map_err(db_err)?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(group_id = %group.id, founder = founder.user_id, "Group created");
        Ok(())
    }

    async fn get_group(&self, group_id: &str) -> Result<Option<Group>> {
        self.get_doc(collections::GROUPS, group_id).await
    }

    async fn get_membership(&self, group_id: &str, user_id: u64) -> Result<Option<Membership>> {
        self.get_doc(collections::MEMBERSHIPS, &Membership::doc_id(group_id, user_id))
            .await
    }

    async fn list_memberships(&self, group_id: &str) -> Result<Vec<Membership>> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::MEMBERSHIPS)
            .filter(|q| q.for_all([q.field("group_id").eq(group_id)]))
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    async fn list_memberships_for_user(&self, user_id: u64) -> Result<Vec<Membership>> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::MEMBERSHIPS)
            .filter(|q| q.for_all([q.field("user_id").eq(user_id)]))
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    async fn add_membership(&self, membership: &Membership) -> Result<bool> {
        let membership = membership.clone();

        self.get_client()?
            .run_transaction::<_, _, AppError>(|db, transaction| {
                let membership = membership.clone();
                async move {
                    let doc_id = Membership::doc_id(&membership.group_id, membership.user_id);
                    let existing: Option<Membership> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::MEMBERSHIPS)
                        .obj()
                        .one(&doc_id)
                        .await
                        .map_err(tx_err)?;

                    if existing.is_some() {
                        return Ok(false);
                    }

                    db.fluent()
                        .update()
                        .in_col(collections::MEMBERSHIPS)
                        .document_id(&doc_id)
                        .object(&membership)
                        .add_to_transaction(transaction)
                        .map_err(tx_err)?;

                    Ok(true)
                }
                .boxed()
            })
            .await
            .map_err(db_err)
    }

    async fn remove_membership(
        &self,
        group_id: &str,
        user_id: u64,
        requested_by: u64,
    ) -> Result<MembershipRemoval> {
        let group_id = group_id.to_string();

        self.get_client()?
            .run_transaction::<_, _, AppError>(|db, transaction| {
                let group_id = group_id.clone();
                async move {
                    let members: Vec<Membership> = db
                        .fluent()
                        .select()
                        .from(collections::MEMBERSHIPS)
                        .filter(|q| q.for_all([q.field("group_id").eq(group_id.as_str())]))
                        .obj()
                        .query()
                        .await
                        .map_err(tx_err)?;

                    if !members
                        .iter()
                        .any(|m| m.user_id == requested_by && m.is_admin())
                    {
                        return Ok(MembershipRemoval::RequesterNotAdmin);
                    }
                    let Some(target) = members.iter().find(|m| m.user_id == user_id).cloned()
                    else {
                        return Ok(MembershipRemoval::NotFound);
                    };
                    if group::is_last_admin(&members, user_id) {
                        return Ok(MembershipRemoval::LastAdmin);
                    }

                    db.fluent()
                        .delete()
                        .from(collections::MEMBERSHIPS)
                        .document_id(Membership::doc_id(&group_id, user_id))
                        .add_to_transaction(transaction)
                        .map_err(tx_err)?;

                    Ok(MembershipRemoval::Removed(target))
                }
                .boxed()
            })
            .await
            .map_err(db_err)
    }

    async fn set_points(
        &self,
        group_id: &str,
        user_id: u64,
        value: i64,
    ) -> Result<Option<(Membership, LedgerEntry)>> {
        let doc_id = Membership::doc_id(group_id, user_id);

        self.get_client()?
            .run_transaction::<_, _, AppError>(|db, transaction| {
                let doc_id = doc_id.clone();
                async move {
                    let member: Option<Membership> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::MEMBERSHIPS)
                        .obj()
                        .one(&doc_id)
                        .await
                        .map_err(tx_err)?;

                    let Some(mut member) = member else {
                        return Ok(None);
                    };

                    let entry = ledger::admin_set(&mut member, value);

                    db.fluent()
                        .update()
                        .in_col(collections::MEMBERSHIPS)
                        .document_id(&doc_id)
                        .object(&member)
                        .add_to_transaction(transaction)
                        .map_err(tx_err)?;

                    Ok(Some((member, entry)))
                }
                .boxed()
            })
            .await
            .map_err(db_err)
    }

    // ─── Activity Operations ─────────────────────────────────────

    async fn get_activity(&self, activity_id: &str) -> Result<Option<Activity>> {
        self.get_doc(collections::ACTIVITIES, activity_id).await
    }

    async fn list_activities(&self, group_id: &str) -> Result<Vec<Activity>> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(|q| q.for_all([q.field("group_id").eq(group_id)]))
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    async fn upsert_activity(&self, activity: &Activity) -> Result<()> {
        self.set_doc(collections::ACTIVITIES, &activity.id, activity)
            .await
    }

    async fn delete_activity(&self, activity_id: &str) -> Result<Option<ActivityDeletion>> {
        let activity_id = activity_id.to_string();

        // 1. Revert credits and delete the activity atomically.
        let reverted = self
            .get_client()?
            .run_transaction::<_, _, AppError>(|db, transaction| {
                let activity_id = activity_id.clone();
                async move {
                    let activity: Option<Activity> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::ACTIVITIES)
                        .obj()
                        .one(&activity_id)
                        .await
                        .map_err(tx_err)?;

                    let Some(activity) = activity else {
                        return Ok(None);
                    };

                    let docs: Vec<SubmissionDoc> = db
                        .fluent()
                        .select()
                        .from(collections::SUBMISSIONS)
                        .filter(|q| q.for_all([q.field("activity_id").eq(activity_id.as_str())]))
                        .obj()
                        .query()
                        .await
                        .map_err(tx_err)?;
                    let submissions = decode_submissions(docs).map_err(BackoffError::Permanent)?;

                    let mut members: Vec<Membership> = db
                        .fluent()
                        .select()
                        .from(collections::MEMBERSHIPS)
                        .filter(|q| {
                            q.for_all([q.field("group_id").eq(activity.group_id.as_str())])
                        })
                        .obj()
                        .query()
                        .await
                        .map_err(tx_err)?;

                    let entries = ledger::revert_for_activity_deletion(
                        &activity,
                        &submissions,
                        &mut members,
                    );

                    let touched: BTreeSet<u64> = entries.iter().map(|e| e.user_id).collect();
                    for member in members.iter().filter(|m| touched.contains(&m.user_id)) {
                        db.fluent()
                            .update()
                            .in_col(collections::MEMBERSHIPS)
                            .document_id(Membership::doc_id(&member.group_id, member.user_id))
                            .object(member)
                            .add_to_transaction(transaction)
                            .map_err(tx_err)?;
                    }

                    db.fluent()
                        .delete()
                        .from(collections::ACTIVITIES)
                        .document_id(&activity.id)
                        .add_to_transaction(transaction)
                        .map_err(tx_err)?;

                    Ok(Some((activity, entries, submissions)))
                }
                .boxed()
            })
            .await
            .map_err(db_err)?;

        let Some((activity, entries, submissions)) = reverted else {
            return Ok(None);
        };

        // 2. Clean up dependent documents. Votes on these submissions already
        //    fail because the activity is gone.
        let submission_ids: Vec<String> = submissions.iter().map(|s| s.id.clone()).collect();
        let slot_keys: Vec<String> = submissions
            .iter()
            .map(|s| s.slot_key())
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect();

        let client = self.get_client()?.clone();
        let review_ids: Vec<String> = stream::iter(submission_ids.clone())
            .map(|submission_id| {
                let client = client.clone();
                async move {
                    let reviews: Vec<Review> = client
                        .fluent()
                        .select()
                        .from(collections::REVIEWS)
                        .filter(|q| {
                            q.for_all([q.field("submission_id").eq(submission_id.as_str())])
                        })
                        .obj()
                        .query()
                        .await
                        .map_err(db_err)?;
                    let ids: Vec<String> = reviews.into_iter().map(|r| r.id).collect();
                    Ok::<_, AppError>(ids)
                }
                .boxed()
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Vec<String>>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<Vec<String>>>>()?
            .into_iter()
            .flatten()
            .collect();

        self.batch_delete(&review_ids, collections::REVIEWS).await?;
        self.batch_delete(&slot_keys, collections::SUBMISSION_SLOTS).await?;
        self.batch_delete(&submission_ids, collections::SUBMISSIONS).await?;

        tracing::debug!(
            activity_id = %activity.id,
            submissions = submission_ids.len(),
            reviews = review_ids.len(),
            "Deleted activity dependents"
        );

        Ok(Some(ActivityDeletion {
            activity,
            entries,
            submissions_deleted: submission_ids.len(),
            reviews_deleted: review_ids.len(),
        }))
    }

    // ─── Submission Operations ───────────────────────────────────

    async fn insert_submission(&self, new: &Submission) -> Result<SubmissionInsert> {
        let new_doc = SubmissionDoc::from_submission(new)?;
        let slot = new.slot_key();

        self.get_client()?
            .run_transaction::<_, _, AppError>(|db, transaction| {
                let new_doc = new_doc.clone();
                let slot = slot.clone();
                async move {
                    // Conflicts with a concurrent delete_activity.
                    let activity: Option<Activity> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::ACTIVITIES)
                        .obj()
                        .one(&new_doc.activity_id)
                        .await
                        .map_err(tx_err)?;
                    if activity.is_none() {
                        return Ok(SubmissionInsert::ActivityMissing);
                    }

                    // Reading the slot document makes concurrent creations for
                    // the same (activity, user, day) conflict.
                    let _slot: Option<SlotDoc> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::SUBMISSION_SLOTS)
                        .obj()
                        .one(&slot)
                        .await
                        .map_err(tx_err)?;

                    let docs: Vec<SubmissionDoc> = db
                        .fluent()
                        .select()
                        .from(collections::SUBMISSIONS)
                        .filter(|q| {
                            q.for_all([
                                q.field("activity_id").eq(new_doc.activity_id.as_str()),
                                q.field("user_id").eq(new_doc.user_id),
                                q.field("day").eq(new_doc.day.as_str()),
                            ])
                        })
                        .obj()
                        .query()
                        .await
                        .map_err(tx_err)?;
                    let existing = decode_submissions(docs).map_err(BackoffError::Permanent)?;

                    let replaced = match plan_slot(existing) {
                        SubmissionInsert::Created { replaced } => replaced,
                        duplicate => return Ok(duplicate),
                    };

                    let mut stale_reviews: Vec<Review> = Vec::new();
                    for old in &replaced {
                        let reviews: Vec<Review> = db
                            .fluent()
                            .select()
                            .from(collections::REVIEWS)
                            .filter(|q| q.for_all([q.field("submission_id").eq(old.id.as_str())]))
                            .obj()
                            .query()
                            .await
                            .map_err(tx_err)?;
                        stale_reviews.extend(reviews);
                    }

                    for review in &stale_reviews {
                        db.fluent()
                            .delete()
                            .from(collections::REVIEWS)
                            .document_id(&review.id)
                            .add_to_transaction(transaction)
                            .map_err(tx_err)?;
                    }
                    for old in &replaced {
                        db.fluent()
                            .delete()
                            .from(collections::SUBMISSIONS)
                            .document_id(&old.id)
                            .add_to_transaction(transaction)
                            .map_err(tx_err)?;
                    }

                    db.fluent()
                        .update()
                        .in_col(collections::SUBMISSIONS)
                        .document_id(&new_doc.id)
                        .object(&new_doc)
                        .add_to_transaction(transaction)
                        .map_err(tx_err)?;

                    db.fluent()
                        .update()
                        .in_col(collections::SUBMISSION_SLOTS)
                        .document_id(&slot)
                        .object(&SlotDoc {
                            submission_id: new_doc.id.clone(),
                        })
                        .add_to_transaction(transaction)
                        .map_err(tx_err)?;

                    Ok(SubmissionInsert::Created { replaced })
                }
                .boxed()
            })
            .await
            .map_err(db_err)
    }

    async fn get_submission(&self, submission_id: &str) -> Result<Option<Submission>> {
        self.get_doc::<SubmissionDoc>(collections::SUBMISSIONS, submission_id)
            .await?
            .map(Submission::try_from)
            .transpose()
    }

    async fn list_submissions_for_activity(&self, activity_id: &str) -> Result<Vec<Submission>> {
        self.query_submissions("activity_id", activity_id).await
    }

    async fn list_submissions_for_user(
        &self,
        activity_id: &str,
        user_id: u64,
    ) -> Result<Vec<Submission>> {
        let docs: Vec<SubmissionDoc> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::SUBMISSIONS)
            .filter(|q| {
                q.for_all([
                    q.field("activity_id").eq(activity_id),
                    q.field("user_id").eq(user_id),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(db_err)?;
        decode_submissions(docs)
    }

    async fn list_submissions_for_group(&self, group_id: &str) -> Result<Vec<Submission>> {
        self.query_submissions("group_id", group_id).await
    }

    async fn list_user_submissions_between(
        &self,
        group_id: &str,
        user_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Submission>> {
        let docs: Vec<SubmissionDoc> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::SUBMISSIONS)
            .filter(|q| {
                q.for_all([
                    q.field("group_id").eq(group_id),
                    q.field("user_id").eq(user_id),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(db_err)?;

        // Day range filtered here to avoid a composite index.
        Ok(decode_submissions(docs)?
            .into_iter()
            .filter(|s| s.day >= from && s.day <= to)
            .collect())
    }

    // ─── Review Operations ───────────────────────────────────────

    async fn list_reviews(&self, submission_id: &str) -> Result<Vec<Review>> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::REVIEWS)
            .filter(|q| q.for_all([q.field("submission_id").eq(submission_id)]))
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    async fn list_reviews_by_reviewer(&self, reviewer_id: u64) -> Result<Vec<Review>> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::REVIEWS)
            .filter(|q| q.for_all([q.field("reviewer_id").eq(reviewer_id)]))
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    async fn record_review(&self, review: &Review) -> Result<ReviewOutcome> {
        let review = review.clone();

        self.get_client()?
            .run_transaction::<_, _, AppError>(|db, transaction| {
                let review = review.clone();
                async move {
                    // 1. Read everything the decision depends on. The submission
                    //    document is rewritten below, so concurrent votes on the
                    //    same submission always conflict and get retried.
                    let doc: Option<SubmissionDoc> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::SUBMISSIONS)
                        .obj()
                        .one(&review.submission_id)
                        .await
                        .map_err(tx_err)?;

                    let Some(doc) = doc else {
                        return Ok(ReviewOutcome::SubmissionNotFound);
                    };
                    let current = Submission::try_from(doc).map_err(BackoffError::Permanent)?;

                    let activity: Option<Activity> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::ACTIVITIES)
                        .obj()
                        .one(&current.activity_id)
                        .await
                        .map_err(tx_err)?;

                    let Some(activity) = activity else {
                        return Ok(ReviewOutcome::SubmissionNotFound);
                    };

                    let existing: Vec<Review> = db
                        .fluent()
                        .select()
                        .from(collections::REVIEWS)
                        .filter(|q| q.for_all([q.field("submission_id").eq(current.id.as_str())]))
                        .obj()
                        .query()
                        .await
                        .map_err(tx_err)?;

                    let members: Vec<Membership> = db
                        .fluent()
                        .select()
                        .from(collections::MEMBERSHIPS)
                        .filter(|q| q.for_all([q.field("group_id").eq(current.group_id.as_str())]))
                        .obj()
                        .query()
                        .await
                        .map_err(tx_err)?;

                    // 2. Decide.
                    let write = match plan_vote(current, existing, &members, &activity, &review) {
                        Ok(write) => write,
                        Err(rejection) => return Ok(ReviewOutcome::Rejected(rejection)),
                    };

                    // 3. Write review, status and credit together.
                    db.fluent()
                        .update()
                        .in_col(collections::REVIEWS)
                        .document_id(&review.id)
                        .object(&review)
                        .add_to_transaction(transaction)
                        .map_err(tx_err)?;

                    let updated = SubmissionDoc::from_submission(&write.recorded.submission)
                        .map_err(BackoffError::Permanent)?;
                    db.fluent()
                        .update()
                        .in_col(collections::SUBMISSIONS)
                        .document_id(&updated.id)
                        .object(&updated)
                        .add_to_transaction(transaction)
                        .map_err(tx_err)?;

                    if let Some(member) = &write.credited_member {
                        db.fluent()
                            .update()
                            .in_col(collections::MEMBERSHIPS)
                            .document_id(Membership::doc_id(&member.group_id, member.user_id))
                            .object(member)
                            .add_to_transaction(transaction)
                            .map_err(tx_err)?;
                    }

                    Ok(ReviewOutcome::Recorded(Box::new(write.recorded)))
                }
                .boxed()
            })
            .await
            .map_err(db_err)
    }
}

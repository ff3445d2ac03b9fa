use chrono::{Duration, Utc};
use rand::{rngs::OsRng, Rng};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::db::is_unique_violation;
use crate::integrations::Mailer;
use crate::models::{InvitationRow, MembershipRow};
use crate::services::auth::{is_valid_email, normalize_email};
use crate::services::error::{ErrorKind, ServiceError};
use crate::services::families::{family_exists, find_membership};
use shared::{FamilyRole, Invitation, PlatformRole, RedeemInvitationResponse};

const INVITATION_EXPIRY_DAYS: i64 = 7;
const INVITE_CODE_LENGTH: usize = 10;
const INVITE_CODE_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";
const MAX_CODE_ATTEMPTS: usize = 3;

pub const INVITATION_SUBJECT: &str = "Join Family Connect";

#[derive(Debug, Error)]
pub enum InvitationError {
    #[error("Family not found")]
    FamilyNotFound,
    #[error("You are not a member of this family")]
    NotAMember,
    #[error("Your role does not allow inviting members")]
    InsufficientRole,
    #[error("A valid email address is required")]
    InvalidEmail,
    #[error("An invite code is required")]
    MissingCode,
    #[error("User is already a member of this family")]
    AlreadyMember,
    #[error("Invitation not found")]
    NotFound,
    #[error("Invitation has expired")]
    Expired,
    #[error("Could not generate a unique invite code")]
    CodeGenerationFailed,
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl ServiceError for InvitationError {
    fn kind(&self) -> ErrorKind {
        match self {
            InvitationError::FamilyNotFound | InvitationError::NotFound => ErrorKind::NotFound,
            InvitationError::NotAMember | InvitationError::InsufficientRole => ErrorKind::Forbidden,
            InvitationError::InvalidEmail | InvitationError::MissingCode => ErrorKind::InvalidInput,
            InvitationError::AlreadyMember => ErrorKind::Conflict,
            InvitationError::Expired => ErrorKind::Expired,
            InvitationError::CodeGenerationFailed => ErrorKind::Internal,
            InvitationError::DatabaseError(e) => ErrorKind::from_db(e),
        }
    }
}

/// Ten symbols from a 64-symbol URL-safe alphabet, drawn from the OS RNG.
pub fn generate_invite_code() -> String {
    let mut rng = OsRng;
    (0..INVITE_CODE_LENGTH)
        .map(|_| INVITE_CODE_ALPHABET[rng.gen_range(0..INVITE_CODE_ALPHABET.len())] as char)
        .collect()
}

fn invitation_html(code: &str) -> String {
    format!(
        "<p>You have been invited to join a family on Family Connect.</p>\
         <p>Your invite code is <strong>{}</strong>. It expires in {} days.</p>",
        code, INVITATION_EXPIRY_DAYS
    )
}

/// Invite `email` into a family. The invitation is committed before the
/// notification email is sent; a failed send is logged and ignored.
pub async fn create_invitation(
    pool: &SqlitePool,
    mailer: &dyn Mailer,
    inviter_id: &Uuid,
    family_id: &Uuid,
    email: &str,
) -> Result<Invitation, InvitationError> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(InvitationError::InvalidEmail);
    }

    let Some(inviter) = find_membership(pool, inviter_id, family_id).await? else {
        return Err(if family_exists(pool, family_id).await? {
            InvitationError::NotAMember
        } else {
            InvitationError::FamilyNotFound
        });
    };
    if !inviter.role().can_invite_members() {
        return Err(InvitationError::InsufficientRole);
    }

    let already_member: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM family_members fm
        INNER JOIN users u ON u.id = fm.user_id
        WHERE fm.family_id = ? AND u.email = ?
        "#,
    )
    .bind(family_id)
    .bind(&email)
    .fetch_one(pool)
    .await?;
    if already_member > 0 {
        return Err(InvitationError::AlreadyMember);
    }

    let now = Utc::now();
    let expires_at = now + Duration::days(INVITATION_EXPIRY_DAYS);

    let mut invitation = None;
    for _ in 0..MAX_CODE_ATTEMPTS {
        let inserted = sqlx::query_as::<_, InvitationRow>(
            r#"
            INSERT INTO invitations (id, email, invite_code, family_id, invited_by, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(generate_invite_code())
        .bind(family_id)
        .bind(inviter_id)
        .bind(expires_at)
        .bind(now)
        .fetch_one(pool)
        .await;

        match inserted {
            Ok(row) => {
                invitation = Some(row);
                break;
            }
            Err(e) if is_unique_violation(&e) => {
                log::warn!("Invite code collision for family {}, retrying", family_id);
            }
            Err(e) => return Err(e.into()),
        }
    }
    let invitation = invitation.ok_or(InvitationError::CodeGenerationFailed)?;

    log::info!("User {} invited {} to family {}", inviter_id, email, family_id);

    if let Err(e) = mailer
        .send_email(&email, INVITATION_SUBJECT, &invitation_html(&invitation.invite_code))
        .await
    {
        log::warn!("Failed to send invitation email to {}: {}", email, e);
    }

    Ok(invitation.to_shared())
}

/// Redeem an invite code. Possession of the code is the credential.
///
/// Deleting the invitation is the first statement of the transaction, so of
/// two concurrent redemptions only one finds the row; the other sees
/// `NotFound`. An expired invitation is left in place and stays unredeemable.
pub async fn redeem_invitation(pool: &SqlitePool, code: &str) -> Result<RedeemInvitationResponse, InvitationError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(InvitationError::MissingCode);
    }

    let mut tx = pool.begin().await?;

    let invitation: InvitationRow =
        sqlx::query_as("DELETE FROM invitations WHERE invite_code = ? RETURNING *")
            .bind(code)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(InvitationError::NotFound)?;

    let now = Utc::now();
    if invitation.is_expired_at(now) {
        tx.rollback().await?;
        return Err(InvitationError::Expired);
    }

    let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
        .bind(&invitation.email)
        .fetch_optional(&mut *tx)
        .await?;

    let user_id = match existing {
        Some(id) => id,
        None => {
            // Placeholder account; claimed later by registering with this email
            let id = Uuid::new_v4();
            sqlx::query(
                r#"
                INSERT INTO users (id, email, name, password_hash, role, is_premium, created_at, updated_at)
                VALUES (?, ?, NULL, NULL, ?, 0, ?, ?)
                "#,
            )
            .bind(id)
            .bind(&invitation.email)
            .bind(PlatformRole::User.as_str())
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            id
        }
    };

    let membership = sqlx::query_as::<_, MembershipRow>(
        r#"
        INSERT INTO family_members (id, user_id, family_id, role, is_main_family, created_at)
        VALUES (?, ?, ?, ?, 0, ?)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(invitation.family_id)
    .bind(FamilyRole::Viewer.as_str())
    .bind(now)
    .fetch_one(&mut *tx)
    .await;

    let membership = match membership {
        Ok(row) => row,
        Err(e) if is_unique_violation(&e) => return Err(InvitationError::AlreadyMember),
        Err(e) => return Err(e.into()),
    };

    tx.commit().await?;

    log::info!(
        "Invitation {} redeemed: user {} joined family {}",
        invitation.id,
        user_id,
        invitation.family_id
    );

    Ok(RedeemInvitationResponse {
        family_id: invitation.family_id,
        membership: membership.to_shared(),
    })
}

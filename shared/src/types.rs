use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// User Types
// ============================================================================

/// Site-wide role. Unrelated to the role a user holds inside a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformRole {
    User,
    Admin,
}

impl PlatformRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformRole::User => "user",
            PlatformRole::Admin => "admin",
        }
    }

    pub fn can_administer_platform(&self) -> bool {
        matches!(self, PlatformRole::Admin)
    }
}

impl FromStr for PlatformRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(PlatformRole::User),
            "admin" => Ok(PlatformRole::Admin),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: PlatformRole,
    pub is_premium: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: Option<String>,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProfileImageRequest {
    pub image_url: String,
}

/// Edit of any account by a platform administrator. Absent fields are left
/// unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminUpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<PlatformRole>,
}

/// One family a user belongs to, as shown on their profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyGroup {
    pub id: Uuid,
    pub name: String,
    pub role: FamilyRole,
    pub is_main_family: bool,
    pub member_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user: User,
    pub family_groups: Vec<FamilyGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactRequest {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
}

// ============================================================================
// Family Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Family {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFamilyRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyDetail {
    pub family: Family,
    pub members: Vec<MemberWithUser>,
}

// ============================================================================
// Membership Types
// ============================================================================

/// Role a user holds inside one family. Privilege order: admin > editor > viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FamilyRole {
    Admin,
    Editor,
    Viewer,
}

impl FamilyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            FamilyRole::Admin => "admin",
            FamilyRole::Editor => "editor",
            FamilyRole::Viewer => "viewer",
        }
    }

    /// Decode a stored role. Anything unrecognised is treated as a viewer so
    /// that every capability check denies it.
    pub fn from_db(s: &str) -> Self {
        s.parse().unwrap_or(FamilyRole::Viewer)
    }

    pub fn can_create_content(&self) -> bool {
        matches!(self, FamilyRole::Admin | FamilyRole::Editor)
    }

    pub fn can_edit_content(&self) -> bool {
        matches!(self, FamilyRole::Admin | FamilyRole::Editor)
    }

    pub fn can_delete_content(&self) -> bool {
        matches!(self, FamilyRole::Admin | FamilyRole::Editor)
    }

    pub fn can_invite_members(&self) -> bool {
        matches!(self, FamilyRole::Admin | FamilyRole::Editor)
    }

    pub fn can_manage_members(&self) -> bool {
        matches!(self, FamilyRole::Admin)
    }
}

impl FromStr for FamilyRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(FamilyRole::Admin),
            "editor" => Ok(FamilyRole::Editor),
            "viewer" => Ok(FamilyRole::Viewer),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub family_id: Uuid,
    pub role: FamilyRole,
    pub is_main_family: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberWithUser {
    pub membership: Membership,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: FamilyRole,
}

// ============================================================================
// Invitation Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub id: Uuid,
    pub email: String,
    pub invite_code: String,
    pub family_id: Uuid,
    pub invited_by: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInvitationRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemInvitationRequest {
    pub invite_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemInvitationResponse {
    pub family_id: Uuid,
    pub membership: Membership,
}

// ============================================================================
// Content Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub family_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Completed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Completed => "completed",
        }
    }
}

impl FromStr for EventStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(EventStatus::Pending),
            "completed" => Ok(EventStatus::Completed),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub family_id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub place: String,
    pub event_date: DateTime<Utc>,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub date: DateTime<Utc>,
    pub place: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateEventStatusRequest {
    pub status: EventStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Photo {
    pub id: Uuid,
    pub family_id: Uuid,
    pub uploader_id: Uuid,
    pub url: String,
    pub public_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePhotoRequest {
    pub url: String,
    pub public_id: String,
}

// ============================================================================
// Subscription Types
// ============================================================================

/// Billing status that grants premium access. Every other status is mirrored
/// verbatim from the billing provider and counts as inactive.
pub const SUBSCRIPTION_STATUS_ACTIVE: &str = "active";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub external_subscription_id: String,
    pub status: String,
    pub price_id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.status == SUBSCRIPTION_STATUS_ACTIVE
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionStatusResponse {
    pub is_subscribed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub price_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub url: String,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSuccess<T> {
    pub data: T,
}

impl<T> ApiSuccess<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_role_permissions() {
        assert!(FamilyRole::Admin.can_create_content());
        assert!(FamilyRole::Admin.can_edit_content());
        assert!(FamilyRole::Admin.can_delete_content());
        assert!(FamilyRole::Admin.can_invite_members());
        assert!(FamilyRole::Admin.can_manage_members());

        assert!(FamilyRole::Editor.can_create_content());
        assert!(FamilyRole::Editor.can_edit_content());
        assert!(FamilyRole::Editor.can_delete_content());
        assert!(FamilyRole::Editor.can_invite_members());
        assert!(!FamilyRole::Editor.can_manage_members());

        assert!(!FamilyRole::Viewer.can_create_content());
        assert!(!FamilyRole::Viewer.can_edit_content());
        assert!(!FamilyRole::Viewer.can_delete_content());
        assert!(!FamilyRole::Viewer.can_invite_members());
        assert!(!FamilyRole::Viewer.can_manage_members());
    }

    #[test]
    fn test_family_role_from_str() {
        assert_eq!("admin".parse(), Ok(FamilyRole::Admin));
        assert_eq!("EDITOR".parse(), Ok(FamilyRole::Editor));
        assert_eq!("Viewer".parse(), Ok(FamilyRole::Viewer));
        assert!("owner".parse::<FamilyRole>().is_err());
    }

    #[test]
    fn test_unknown_family_role_fails_closed() {
        let role = FamilyRole::from_db("superuser");
        assert_eq!(role, FamilyRole::Viewer);
        assert!(!role.can_create_content());
        assert!(!role.can_manage_members());
    }

    #[test]
    fn test_platform_role_is_distinct_from_family_role() {
        assert_eq!("admin".parse(), Ok(PlatformRole::Admin));
        assert!(PlatformRole::Admin.can_administer_platform());
        assert!(!PlatformRole::User.can_administer_platform());
        assert!("editor".parse::<PlatformRole>().is_err());
    }

    #[test]
    fn test_event_status_from_str() {
        assert_eq!("pending".parse(), Ok(EventStatus::Pending));
        assert_eq!("COMPLETED".parse(), Ok(EventStatus::Completed));
        assert!("archived".parse::<EventStatus>().is_err());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&UpdateRoleRequest { role: FamilyRole::Editor }).unwrap();
        assert_eq!(json, r#"{"role":"editor"}"#);
    }

    #[test]
    fn test_subscription_is_active() {
        let mut sub = Subscription {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            external_subscription_id: "sub_123".to_string(),
            status: "active".to_string(),
            price_id: "price_basic".to_string(),
            start_date: Utc::now(),
            end_date: Utc::now(),
        };
        assert!(sub.is_active());

        sub.status = "past_due".to_string();
        assert!(!sub.is_active());
    }

    #[test]
    fn test_api_success() {
        let success = ApiSuccess::new("test data");
        assert_eq!(success.data, "test data");
    }
}

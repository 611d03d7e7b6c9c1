//! Row types backing the marketplace tables. Joined display names ride along
//! on `ServiceRequestRow` the same way the queries select them.

/// Account role, fixed at creation. Stored as lowercase text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Professional,
    Customer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Professional => "professional",
            Role::Customer => "customer",
        }
    }
}

/// Lifecycle of a service request: requested -> accepted -> closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum RequestStatus {
    Requested,
    Accepted,
    Closed,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Requested => "requested",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfessionalRow {
    pub id: String,
    pub user_id: String,
    pub fullname: String,
    pub service_name: String,
    pub experience_years: i64,
    pub document_path: String,
    pub address: String,
    pub pincode: String,
    pub is_approved: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CustomerRow {
    pub id: String,
    pub user_id: String,
    pub fullname: String,
    pub address: String,
    pub pincode: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ServiceRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub base_price: f64,
}

/// Service request plus the display names its screens need. `customer_name`,
/// `service_name` and `professional_name` come from LEFT JOINs and are NULL
/// when the other side is missing or unassigned.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ServiceRequestRow {
    pub id: String,
    pub customer_id: String,
    pub service_id: String,
    pub professional_id: Option<String>,
    pub requested_at: String,
    pub status: RequestStatus,
    pub customer_name: Option<String>,
    pub service_name: Option<String>,
    pub professional_name: Option<String>,
}

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: String,
    pub service_request_id: String,
    pub professional_id: String,
    pub customer_id: String,
    pub rating: i64,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActivityRow {
    pub message: String,
    pub created_at: String,
}

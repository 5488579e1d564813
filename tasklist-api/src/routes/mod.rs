/// API route handlers
///
/// Organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Register, login, current user
/// - `persons`: Person CRUD
/// - `profiles`: Profile CRUD with person back-reference
/// - `projects`: Project CRUD and project-scoped task routes
/// - `tasks`: Task CRUD, listing, and admin views

pub mod auth;
pub mod health;
pub mod persons;
pub mod profiles;
pub mod projects;
pub mod tasks;

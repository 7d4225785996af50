//! Admin account safeguards against a real database.
//!
//! ```sh
//! cargo test --test user_admin_tests -- --ignored
//! ```

mod common;

use common::fixtures::TestUser;
use common::TestContext;
use supply_depot_backend::error::AppError;
use supply_depot_backend::models::user::UserRole;
use supply_depot_backend::services::user_service::{UserService, UserUpdate};

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_last_active_admin_cannot_be_removed() {
    let ctx = TestContext::new().await;
    let users = UserService::new(ctx.pool.clone());
    let admin = ctx.create_user(TestUser::admin()).await;
    let agency = ctx.create_user(TestUser::agency()).await;

    let parked = ctx.park_other_admins(Some(admin.id)).await;

    let demote = users
        .update(
            admin.id,
            &UserUpdate {
                role: Some(UserRole::Agency),
                ..Default::default()
            },
        )
        .await;
    let deactivate = users
        .update(
            admin.id,
            &UserUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await;
    let delete = users.delete(admin.id, agency.id).await;

    // With a second active admin the same demotion goes through
    let backup = ctx.create_user(TestUser::admin()).await;
    let demote_with_backup = users
        .update(
            admin.id,
            &UserUpdate {
                role: Some(UserRole::Agency),
                ..Default::default()
            },
        )
        .await;

    ctx.reactivate(&parked).await;

    assert!(matches!(demote, Err(AppError::BusinessRule(_))), "{demote:?}");
    assert!(matches!(deactivate, Err(AppError::BusinessRule(_))), "{deactivate:?}");
    assert!(matches!(delete, Err(AppError::BusinessRule(_))), "{delete:?}");
    assert_eq!(demote_with_backup.unwrap().role, UserRole::Agency);

    let still_admin = users.get(backup.id).await.unwrap();
    assert!(still_admin.is_active);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_account_cannot_delete_itself() {
    let ctx = TestContext::new().await;
    let users = UserService::new(ctx.pool.clone());
    let agency = ctx.create_user(TestUser::agency()).await;

    let err = users.delete(agency.id, agency.id).await.unwrap_err();
    assert!(matches!(err, AppError::BusinessRule(_)));
    assert!(users.get(agency.id).await.is_ok());
}

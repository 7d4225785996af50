//! First-boot admin provisioning against a real database.
//!
//! The test temporarily turns every admin into an inactive agency account
//! and restores them afterwards, so it lives in its own test binary.
//!
//! ```sh
//! cargo test --test admin_provisioning_tests -- --ignored
//! ```

mod common;

use common::fixtures::TestUser;
use common::{test_id, TestContext};
use supply_depot_backend::error::AppError;
use supply_depot_backend::services::user_service::UserService;

async fn admin_count(ctx: &TestContext) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
        .fetch_one(&ctx.pool)
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_ensure_admin_reports_taken_username_and_email() {
    let ctx = TestContext::new().await;
    let users = UserService::new(ctx.pool.clone());
    let squatter = ctx.create_user(TestUser::agency()).await;

    let parked = ctx.demote_all_admins().await;

    let taken_name = users
        .ensure_admin(&squatter.username, &format!("{}@test.local", test_id()), None)
        .await;
    let admins_after_name = admin_count(&ctx).await;

    let taken_email = users
        .ensure_admin(&format!("root_{}", test_id()), &squatter.email, Some("password123"))
        .await;
    let admins_after_email = admin_count(&ctx).await;

    let fresh_name = format!("root_{}", test_id());
    let provisioned = users
        .ensure_admin(&fresh_name, &format!("{}@test.local", fresh_name), None)
        .await;
    let admins_after_fresh = admin_count(&ctx).await;

    sqlx::query("DELETE FROM users WHERE username = $1")
        .bind(&fresh_name)
        .execute(&ctx.pool)
        .await
        .unwrap();
    ctx.restore_admins(&parked).await;

    match taken_name {
        Err(AppError::Config(msg)) => assert!(msg.contains(&squatter.username), "{msg}"),
        other => panic!("expected config error, got {other:?}"),
    }
    assert_eq!(admins_after_name, 0);

    match taken_email {
        Err(AppError::BusinessRule(msg)) => assert!(msg.contains("Email"), "{msg}"),
        other => panic!("expected business rule error, got {other:?}"),
    }
    assert_eq!(admins_after_email, 0);

    // A generated password is only reported when an account really exists
    assert!(provisioned.unwrap().is_some());
    assert_eq!(admins_after_fresh, 1);
}

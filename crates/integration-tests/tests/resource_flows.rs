//! Integration tests for customer, policy, claim and user administration pages.

#![allow(clippy::unwrap_used)]

use insurance_console_core::{Claim, ClaimStatus};
use insurance_console_integration_tests::{ADMIN_PASSWORD, AGENT_PASSWORD, TestContext, location};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};

async fn signed_in() -> TestContext {
    let ctx = TestContext::start().await;
    let response = ctx.login("agent", AGENT_PASSWORD).await;
    assert_eq!(location(&response).as_deref(), Some("/"));
    ctx
}

// =============================================================================
// Customers
// =============================================================================

#[tokio::test]
async fn test_create_customer_and_show_it() {
    let ctx = signed_in().await;

    let response = ctx
        .post(
            "/customers",
            &[
                ("last_name", "Dupont"),
                ("first_name", "Marie"),
                ("email", "marie@example.com"),
                ("address", "1 rue de la Paix"),
                ("phone", "0102030405"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let target = location(&response).unwrap();
    assert!(target.starts_with("/customers/"));

    {
        let world = ctx.backend.world.lock();
        assert_eq!(world.customers.len(), 1);
        assert_eq!(world.customers[0]["nom"], "Dupont");
        assert_eq!(world.customers[0]["adresse"], "1 rue de la Paix");
    }

    let page = ctx.get(&target).await;
    assert_eq!(page.status(), StatusCode::OK);
    let body = page.text().await.unwrap();
    assert!(body.contains("Marie Dupont"));
    assert!(body.contains("Customer created successfully"));
}

#[tokio::test]
async fn test_invalid_customer_is_not_sent() {
    let ctx = signed_in().await;

    let response = ctx
        .post(
            "/customers",
            &[
                ("last_name", "Dupont"),
                ("first_name", "Marie"),
                ("email", "not-an-email"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(ctx.backend.count("POST /customers"), 0);
}

#[tokio::test]
async fn test_customer_list_filters_locally() {
    let ctx = signed_in().await;
    ctx.backend.seed_customer("Dupont", "Marie", "marie@example.com");
    ctx.backend.seed_customer("Martin", "Lea", "lea@example.com");

    let body = ctx.get("/customers?q=dup").await.text().await.unwrap();
    assert!(body.contains("Marie Dupont"));
    assert!(!body.contains("Lea Martin"));

    let body = ctx.get("/customers").await.text().await.unwrap();
    assert!(body.contains("Marie Dupont"));
    assert!(body.contains("Lea Martin"));
}

#[tokio::test]
async fn test_delete_customer_requires_confirmation() {
    let ctx = signed_in().await;
    let id = ctx.backend.seed_customer("Dupont", "Marie", "marie@example.com");

    let confirm = ctx.get(&format!("/customers/{id}/delete")).await;
    assert_eq!(confirm.status(), StatusCode::OK);

    let response = ctx.post(&format!("/customers/{id}/delete"), &[]).await;
    assert_eq!(location(&response), Some(format!("/customers/{id}")));
    assert_eq!(ctx.backend.count("DELETE /customers/{id}"), 0);

    let response = ctx
        .post(&format!("/customers/{id}/delete"), &[("confirm", "yes")])
        .await;
    assert_eq!(location(&response).as_deref(), Some("/customers"));
    assert_eq!(ctx.backend.count("DELETE /customers/{id}"), 1);
    assert!(ctx.backend.world.lock().customers.is_empty());
}

#[tokio::test]
async fn test_missing_customer_is_not_found() {
    let ctx = signed_in().await;

    let response = ctx.get("/customers/999").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Policies
// =============================================================================

#[tokio::test]
async fn test_create_policy_for_customer() {
    let ctx = signed_in().await;
    let customer = ctx.backend.seed_customer("Dupont", "Marie", "marie@example.com");
    let customer_id = customer.to_string();

    let response = ctx
        .post(
            "/policies",
            &[
                ("policy_type", "HABITATION"),
                ("effective_date", "2026-01-01"),
                ("expiry_date", "2027-01-01"),
                ("coverage", "150000"),
                ("customer_id", &customer_id),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let target = location(&response).unwrap();

    {
        let world = ctx.backend.world.lock();
        assert_eq!(world.policies.len(), 1);
        assert_eq!(world.policies[0]["type"], "HABITATION");
        assert_eq!(world.policies[0]["clientId"], customer);
    }

    let page = ctx.get(&target).await;
    assert_eq!(page.status(), StatusCode::OK);
    assert!(page.text().await.unwrap().contains("Marie Dupont"));
}

#[tokio::test]
async fn test_policy_with_expiry_before_effective_is_rejected() {
    let ctx = signed_in().await;
    let customer = ctx.backend.seed_customer("Dupont", "Marie", "marie@example.com");
    let customer_id = customer.to_string();

    let response = ctx
        .post(
            "/policies",
            &[
                ("policy_type", "AUTO"),
                ("effective_date", "2026-06-01"),
                ("expiry_date", "2026-01-01"),
                ("coverage", "1000"),
                ("customer_id", &customer_id),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(ctx.backend.count("POST /policies"), 0);
}

#[tokio::test]
async fn test_policy_list_filters_by_type() {
    let ctx = signed_in().await;
    let customer = ctx.backend.seed_customer("Dupont", "Marie", "marie@example.com");
    let auto = ctx.backend.seed_policy("AUTO", customer, "2026-01-01");
    let health = ctx.backend.seed_policy("SANTE", customer, "2026-02-01");

    let body = ctx.get("/policies?type=SANTE").await.text().await.unwrap();
    assert!(body.contains(&format!("/policies/{health}")));
    assert!(!body.contains(&format!("/policies/{auto}\"")));
}

// =============================================================================
// Claims
// =============================================================================

#[tokio::test]
async fn test_file_and_process_claim() {
    let ctx = signed_in().await;
    let customer = ctx.backend.seed_customer("Dupont", "Marie", "marie@example.com");
    let policy = ctx.backend.seed_policy("AUTO", customer, "2026-01-01");
    let policy_id = policy.to_string();

    let response = ctx
        .post(
            "/claims",
            &[
                ("date", "2026-03-04"),
                ("description", "Rear bumper"),
                ("amount_claimed", "800"),
                ("policy_id", &policy_id),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let target = location(&response).unwrap();

    let claim_id = {
        let world = ctx.backend.world.lock();
        let claim: Claim = serde_json::from_value(world.claims[0].clone()).unwrap();
        assert_eq!(claim.status(), ClaimStatus::Pending);
        claim.id
    };

    let response = ctx
        .post(&format!("/claims/{claim_id}/process"), &[("amount", "0")])
        .await;
    assert_eq!(location(&response).as_deref(), Some(target.as_str()));
    assert_eq!(ctx.backend.count("PATCH /claims/{id}/process"), 0);

    let response = ctx
        .post(&format!("/claims/{claim_id}/process"), &[("amount", "650")])
        .await;
    assert_eq!(location(&response).as_deref(), Some(target.as_str()));

    let world = ctx.backend.world.lock();
    let claim: Claim = serde_json::from_value(world.claims[0].clone()).unwrap();
    assert_eq!(claim.status(), ClaimStatus::Processed);
}

#[tokio::test]
async fn test_claim_status_filter() {
    let ctx = signed_in().await;
    let customer = ctx.backend.seed_customer("Dupont", "Marie", "marie@example.com");
    let policy = ctx.backend.seed_policy("AUTO", customer, "2026-01-01");
    let pending = ctx.backend.seed_claim(policy, "2026-03-01", 0.0);
    let processed = ctx.backend.seed_claim(policy, "2026-03-02", 300.0);

    let body = ctx.get("/claims?status=pending").await.text().await.unwrap();
    assert!(body.contains(&format!("/claims/{pending}\"")));
    assert!(!body.contains(&format!("/claims/{processed}\"")));

    let body = ctx.get("/claims?status=processed").await.text().await.unwrap();
    assert!(!body.contains(&format!("/claims/{pending}\"")));
    assert!(body.contains(&format!("/claims/{processed}\"")));
}

#[tokio::test]
async fn test_every_claim_view_reads_the_same_list() {
    let ctx = TestContext::start().await;
    ctx.login("boss", ADMIN_PASSWORD).await;
    let customer = ctx.backend.seed_customer("Dupont", "Marie", "marie@example.com");
    let policy = ctx.backend.seed_policy("AUTO", customer, "2026-01-01");
    let claim = ctx.backend.seed_claim(policy, "2026-03-01", 0.0);

    let dashboard = ctx.get("/").await.text().await.unwrap();
    assert!(dashboard.contains(&format!("/claims/{claim}\"")));
    let list = ctx.get("/claims?status=pending").await.text().await.unwrap();
    assert!(list.contains(&format!("/claims/{claim}\"")));
    let admin = ctx.get("/admin").await;
    assert_eq!(admin.status(), StatusCode::OK);

    assert_eq!(ctx.backend.count("GET /claims"), 3);
    assert_eq!(ctx.backend.count("GET /policies/claims"), 0);
}

#[tokio::test]
async fn test_upload_claim_document() {
    let ctx = signed_in().await;
    let customer = ctx.backend.seed_customer("Dupont", "Marie", "marie@example.com");
    let policy = ctx.backend.seed_policy("AUTO", customer, "2026-01-01");
    let claim = ctx.backend.seed_claim(policy, "2026-03-01", 0.0);

    let form = Form::new().part(
        "file",
        Part::bytes(b"%PDF-1.4 report".to_vec())
            .file_name("report.pdf")
            .mime_str("application/pdf")
            .unwrap(),
    );
    let response = ctx
        .client
        .post(format!("{}/claims/{claim}/documents", ctx.console_url))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(ctx.backend.count("POST /claims/{id}/documents"), 1);

    let body = ctx.get(&format!("/claims/{claim}")).await.text().await.unwrap();
    assert!(body.contains("report.pdf"));
}

#[tokio::test]
async fn test_delete_claim_after_confirmation() {
    let ctx = signed_in().await;
    let customer = ctx.backend.seed_customer("Dupont", "Marie", "marie@example.com");
    let policy = ctx.backend.seed_policy("AUTO", customer, "2026-01-01");
    let claim = ctx.backend.seed_claim(policy, "2026-03-01", 0.0);

    let response = ctx
        .post(&format!("/claims/{claim}/delete"), &[("confirm", "yes")])
        .await;
    assert_eq!(location(&response).as_deref(), Some("/claims"));
    assert!(ctx.backend.world.lock().claims.is_empty());
}

#[tokio::test]
async fn test_forbidden_claim_delete_keeps_claim() {
    let ctx = signed_in().await;
    let customer = ctx.backend.seed_customer("Dupont", "Marie", "marie@example.com");
    let policy = ctx.backend.seed_policy("AUTO", customer, "2026-01-01");
    let claim = ctx.backend.seed_claim(policy, "2026-03-01", 0.0);
    ctx.backend.world.lock().forbid_claim_deletes = true;

    let response = ctx
        .post(&format!("/claims/{claim}/delete"), &[("confirm", "yes")])
        .await;
    assert_eq!(location(&response), Some(format!("/claims/{claim}")));
    assert_eq!(ctx.backend.world.lock().claims.len(), 1);

    let body = ctx.get("/claims").await.text().await.unwrap();
    assert!(body.contains("You do not have permission to perform this action."));
    assert!(body.contains(&format!("/claims/{claim}\"")));
}

// =============================================================================
// Administration
// =============================================================================

#[tokio::test]
async fn test_admin_deactivates_and_promotes_user() {
    let ctx = TestContext::start().await;
    ctx.login("boss", ADMIN_PASSWORD).await;

    let response = ctx
        .post("/admin/users/1/active", &[("active", "false")])
        .await;
    assert_eq!(location(&response).as_deref(), Some("/admin"));

    let response = ctx.post("/admin/users/1/role", &[("role", "ADMIN")]).await;
    assert_eq!(location(&response).as_deref(), Some("/admin"));

    {
        let world = ctx.backend.world.lock();
        let agent = world.users.iter().find(|u| u["id"] == 1).unwrap();
        assert_eq!(agent["active"], false);
        assert_eq!(agent["role"], "ADMIN");
    }

    let body = ctx.get("/admin").await.text().await.unwrap();
    assert!(body.contains("User agent deactivated"));
}

#[tokio::test]
async fn test_admin_cannot_deactivate_self() {
    let ctx = TestContext::start().await;
    ctx.login("boss", ADMIN_PASSWORD).await;

    ctx.post("/admin/users/2/active", &[("active", "false")])
        .await;
    assert_eq!(ctx.backend.count("PATCH /auth-service/users/active"), 0);

    let body = ctx.get("/admin").await.text().await.unwrap();
    assert!(body.contains("You cannot deactivate your own account."));
}

#[tokio::test]
async fn test_client_cannot_change_roles() {
    let ctx = signed_in().await;

    let response = ctx.post("/admin/users/2/role", &[("role", "CLIENT")]).await;
    assert_eq!(location(&response).as_deref(), Some("/"));
    assert_eq!(ctx.backend.count("PATCH /auth-service/users/role"), 0);
}

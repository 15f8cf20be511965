//! Integration tests for the authorization resolver using in-memory
//! SurrealDB.

use chrono::{Duration, Utc};
use habilit_core::models::application::{Application, CreateApplication};
use habilit_core::models::entite::{CreateEntite, Entite};
use habilit_core::models::fonction::FonctionApi;
use habilit_core::models::permission::{CreatePermission, Permission};
use habilit_core::models::role::{CreateRole, Role};
use habilit_core::models::utilisateur::{CreateUtilisateur, UserStatus, Utilisateur};
use habilit_core::repository::{
    ApplicationRepository, EntiteRepository, FonctionRepository, PermissionRepository,
    RoleRepository, UtilisateurRepository, UtilisateurRoleRepository,
};
use habilit_db::repository::{
    SurrealApplicationRepository, SurrealEntiteRepository, SurrealFonctionRepository,
    SurrealPermissionRepository, SurrealRoleRepository, SurrealUtilisateurRepository,
    SurrealUtilisateurRoleRepository,
};
use habilit_engine::{AccessResolver, Decision, DenyReason, Eligibility, FonctionRegistry};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    habilit_db::run_migrations(&db).await.unwrap();
    db
}

fn resolver(
    db: &Surreal<Db>,
) -> AccessResolver<
    SurrealUtilisateurRepository<Db>,
    SurrealUtilisateurRoleRepository<Db>,
    SurrealFonctionRepository<Db>,
    SurrealRoleRepository<Db>,
> {
    AccessResolver::new(
        SurrealUtilisateurRepository::new(db.clone()),
        SurrealUtilisateurRoleRepository::new(db.clone()),
        SurrealFonctionRepository::new(db.clone()),
        SurrealRoleRepository::new(db.clone()),
    )
}

async fn create_app(db: &Surreal<Db>, name: &str) -> Application {
    SurrealApplicationRepository::new(db.clone())
        .create(CreateApplication {
            name: name.into(),
            description: "test application".into(),
            color: "#0055a4".into(),
            icon: None,
        })
        .await
        .unwrap()
}

async fn create_entite(db: &Surreal<Db>, name: &str, code: &str) -> Entite {
    SurrealEntiteRepository::new(db.clone())
        .create(CreateEntite {
            name: name.into(),
            code: code.into(),
            email: format!("{code}@example.org"),
        })
        .await
        .unwrap()
}

async fn create_user(db: &Surreal<Db>, login: &str, entite_id: Uuid) -> Utilisateur {
    SurrealUtilisateurRepository::new(db.clone())
        .create(CreateUtilisateur {
            last_name: "Doe".into(),
            first_name: "Jane".into(),
            login: login.into(),
            email: format!("{login}@example.org"),
            status: UserStatus::Active,
            expires_at: None,
            profile: "Agent".into(),
            entite_id,
        })
        .await
        .unwrap()
}

async fn create_role(db: &Surreal<Db>, name: &str, app_id: Uuid) -> Role {
    SurrealRoleRepository::new(db.clone())
        .create(CreateRole {
            name: name.into(),
            description: "test role".into(),
            app_id,
        })
        .await
        .unwrap()
}

async fn create_permission(db: &Surreal<Db>, name: &str) -> Permission {
    SurrealPermissionRepository::new(db.clone())
        .create(CreatePermission {
            name: name.into(),
            description: "test permission".into(),
        })
        .await
        .unwrap()
}

async fn register_fonction(db: &Surreal<Db>, app_id: Uuid, name: &str) -> FonctionApi {
    FonctionRegistry::new(SurrealFonctionRepository::new(db.clone()))
        .ensure_registered(app_id, name, None)
        .await
        .unwrap()
}

async fn grant(db: &Surreal<Db>, user_id: Uuid, role_id: Uuid, app_id: Uuid) {
    SurrealUtilisateurRoleRepository::new(db.clone())
        .assign(user_id, role_id, app_id)
        .await
        .unwrap();
}

// ---------------------------------------------------------------------------
// Authorization walk
// ---------------------------------------------------------------------------

#[tokio::test]
async fn user_without_role_is_denied_everything() {
    let db = setup().await;
    let app = create_app(&db, "Pilotage").await;
    let entite = create_entite(&db, "Direction Générale", "DG").await;
    let user = create_user(&db, "jdoe", entite.id).await;
    register_fonction(&db, app.id, "export_data").await;

    let decision = resolver(&db)
        .authorize(user.id, app.id, "export_data")
        .await
        .unwrap();

    assert_eq!(decision, Decision::Deny(DenyReason::NoRoleInApplication));
    assert!(!decision.is_allowed());
}

#[tokio::test]
async fn unregistered_fonction_is_denied() {
    let db = setup().await;
    let app = create_app(&db, "Pilotage").await;
    let entite = create_entite(&db, "Direction Générale", "DG").await;
    let user = create_user(&db, "jdoe", entite.id).await;
    let role = create_role(&db, "lecteur", app.id).await;
    grant(&db, user.id, role.id, app.id).await;

    let decision = resolver(&db)
        .authorize(user.id, app.id, "never_registered")
        .await
        .unwrap();

    assert_eq!(decision, Decision::Deny(DenyReason::UnknownFonction));
}

#[tokio::test]
async fn permissionless_fonction_allows_any_role_holder() {
    let db = setup().await;
    let app = create_app(&db, "Pilotage").await;
    let entite = create_entite(&db, "Direction Générale", "DG").await;
    let member = create_user(&db, "member", entite.id).await;
    let outsider = create_user(&db, "outsider", entite.id).await;
    let role = create_role(&db, "lecteur", app.id).await;
    grant(&db, member.id, role.id, app.id).await;
    register_fonction(&db, app.id, "list_pages").await;

    let resolver = resolver(&db);

    let member_decision = resolver
        .authorize(member.id, app.id, "list_pages")
        .await
        .unwrap();
    assert_eq!(member_decision, Decision::Allow);

    let outsider_decision = resolver
        .authorize(outsider.id, app.id, "list_pages")
        .await
        .unwrap();
    assert_eq!(
        outsider_decision,
        Decision::Deny(DenyReason::NoRoleInApplication)
    );
}

#[tokio::test]
async fn restricted_fonction_requires_permission_intersection() {
    let db = setup().await;
    let app = create_app(&db, "Pilotage").await;
    let entite = create_entite(&db, "Direction Générale", "DG").await;
    let user = create_user(&db, "jdoe", entite.id).await;
    let role = create_role(&db, "lecteur", app.id).await;
    grant(&db, user.id, role.id, app.id).await;

    let fonctions = SurrealFonctionRepository::new(db.clone());
    let roles = SurrealRoleRepository::new(db.clone());
    let fonction = register_fonction(&db, app.id, "export_data").await;
    let p_read = create_permission(&db, "can_read").await;
    let p_write = create_permission(&db, "can_write").await;

    // Unrelated noise: a second role with a permission the fonction
    // does not require.
    let other_role = create_role(&db, "rédacteur", app.id).await;
    roles
        .attach_permissions(other_role.id, &[p_write.id])
        .await
        .unwrap();

    fonctions
        .attach_permissions(fonction.id, &[p_read.id])
        .await
        .unwrap();

    let resolver = resolver(&db);

    // Role has no permission in the fonction's set.
    let decision = resolver
        .authorize(user.id, app.id, "export_data")
        .await
        .unwrap();
    assert_eq!(decision, Decision::Deny(DenyReason::NoMatchingPermission));

    // Attach the required permission to the user's role.
    roles.attach_permissions(role.id, &[p_read.id]).await.unwrap();

    let decision = resolver
        .authorize(user.id, app.id, "export_data")
        .await
        .unwrap();
    assert_eq!(decision, Decision::Allow);
}

#[tokio::test]
async fn permissions_do_not_leak_across_applications() {
    let db = setup().await;
    let app_a = create_app(&db, "Pilotage").await;
    let app_b = create_app(&db, "Reporting").await;
    let entite = create_entite(&db, "Direction Générale", "DG").await;
    let user = create_user(&db, "jdoe", entite.id).await;

    let fonctions = SurrealFonctionRepository::new(db.clone());
    let roles = SurrealRoleRepository::new(db.clone());
    let permission = create_permission(&db, "can_export").await;

    // In application A the user's role carries the permission.
    let role_a = create_role(&db, "exportateur", app_a.id).await;
    roles
        .attach_permissions(role_a.id, &[permission.id])
        .await
        .unwrap();
    grant(&db, user.id, role_a.id, app_a.id).await;

    // Application B protects its own fonction with the same global
    // permission, but the user's role there carries nothing.
    let role_b = create_role(&db, "lecteur", app_b.id).await;
    grant(&db, user.id, role_b.id, app_b.id).await;
    let fonction_b = register_fonction(&db, app_b.id, "export_data").await;
    fonctions
        .attach_permissions(fonction_b.id, &[permission.id])
        .await
        .unwrap();

    let decision = resolver(&db)
        .authorize(user.id, app_b.id, "export_data")
        .await
        .unwrap();

    assert_eq!(decision, Decision::Deny(DenyReason::NoMatchingPermission));
}

#[tokio::test]
async fn export_data_scenario_round_trip() {
    let db = setup().await;
    let app = create_app(&db, "A1").await;
    let entite = create_entite(&db, "Direction Générale", "DG").await;
    let user = create_user(&db, "u1", entite.id).await;
    let role = create_role(&db, "R1", app.id).await;
    grant(&db, user.id, role.id, app.id).await;
    let fonction = register_fonction(&db, app.id, "export_data").await;

    let fonctions = SurrealFonctionRepository::new(db.clone());
    let roles = SurrealRoleRepository::new(db.clone());
    let resolver = resolver(&db);

    // No permission attached anywhere: default-allow.
    let decision = resolver
        .authorize(user.id, app.id, "export_data")
        .await
        .unwrap();
    assert_eq!(decision, Decision::Allow);

    // Restrict the fonction with P1, which the role does not hold.
    let p1 = create_permission(&db, "P1").await;
    fonctions
        .attach_permissions(fonction.id, &[p1.id])
        .await
        .unwrap();
    let decision = resolver
        .authorize(user.id, app.id, "export_data")
        .await
        .unwrap();
    assert_eq!(decision, Decision::Deny(DenyReason::NoMatchingPermission));

    // Grant P1 to the role: allowed again.
    roles.attach_permissions(role.id, &[p1.id]).await.unwrap();
    let decision = resolver
        .authorize(user.id, app.id, "export_data")
        .await
        .unwrap();
    assert_eq!(decision, Decision::Allow);
}

#[tokio::test]
async fn denied_access_is_forbidden_as_error() {
    let db = setup().await;
    let app = create_app(&db, "Pilotage").await;
    let entite = create_entite(&db, "Direction Générale", "DG").await;
    let user = create_user(&db, "jdoe", entite.id).await;
    register_fonction(&db, app.id, "export_data").await;

    let err = resolver(&db)
        .ensure_authorized(user.id, app.id, "export_data")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        habilit_core::HabilitError::Forbidden { .. }
    ));
}

// ---------------------------------------------------------------------------
// Eligibility
// ---------------------------------------------------------------------------

#[tokio::test]
async fn eligibility_checks_expiration_status_and_membership() {
    let db = setup().await;
    let app = create_app(&db, "Pilotage").await;
    let entite = create_entite(&db, "Direction Générale", "DG").await;
    let users = SurrealUtilisateurRepository::new(db.clone());
    let user = create_user(&db, "jdoe", entite.id).await;
    let resolver = resolver(&db);

    // Unknown user.
    let eligibility = resolver
        .check_eligibility(Uuid::new_v4(), None)
        .await
        .unwrap();
    assert!(!eligibility.is_eligible());

    // No expiration, active, no app requested: eligible.
    let eligibility = resolver.check_eligibility(user.id, None).await.unwrap();
    assert_eq!(eligibility, Eligibility::Eligible);

    // No role in the requested application.
    let eligibility = resolver
        .check_eligibility(user.id, Some(app.id))
        .await
        .unwrap();
    assert!(!eligibility.is_eligible());

    let role = create_role(&db, "lecteur", app.id).await;
    grant(&db, user.id, role.id, app.id).await;
    let eligibility = resolver
        .check_eligibility(user.id, Some(app.id))
        .await
        .unwrap();
    assert_eq!(eligibility, Eligibility::Eligible);

    // Suspended account.
    users
        .update_status(user.id, UserStatus::Suspended)
        .await
        .unwrap();
    let eligibility = resolver.check_eligibility(user.id, None).await.unwrap();
    assert!(!eligibility.is_eligible());

    // Expired account trumps everything but existence.
    users
        .update_status(user.id, UserStatus::Active)
        .await
        .unwrap();
    users
        .extend_expiration(user.id, Some(Utc::now() - Duration::days(1)))
        .await
        .unwrap();
    let eligibility = resolver.check_eligibility(user.id, None).await.unwrap();
    assert!(!eligibility.is_eligible());
}

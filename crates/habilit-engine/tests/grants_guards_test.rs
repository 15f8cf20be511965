//! Integration tests for grant management, mutation guards, the
//! operation registry and the trace recorder, using in-memory
//! SurrealDB.

use chrono::{Duration, Utc};
use habilit_core::HabilitError;
use habilit_core::models::application::{Application, CreateApplication};
use habilit_core::models::codification::CreateCodification;
use habilit_core::models::entite::{CreateEntite, Entite};
use habilit_core::models::objectif::CreateObjectif;
use habilit_core::models::permission::CreatePermission;
use habilit_core::models::role::{CreateRole, Role};
use habilit_core::models::setting::CreateSetting;
use habilit_core::models::utilisateur::{CreateUtilisateur, UserStatus, Utilisateur};
use habilit_core::repository::{
    ApplicationRepository, CodificationRepository, EntiteRepository, FonctionRepository,
    ObjectifRepository, Pagination, PermissionRepository, RoleRepository, SettingRepository,
    TraceRepository, UtilisateurRepository, UtilisateurRoleRepository,
};
use habilit_db::repository::{
    SurrealApplicationRepository, SurrealCodificationRepository, SurrealEntiteRepository,
    SurrealFonctionRepository, SurrealObjectifRepository, SurrealPermissionRepository,
    SurrealRoleRepository, SurrealSettingRepository, SurrealTraceRepository,
    SurrealUtilisateurRepository, SurrealUtilisateurRoleRepository,
};
use habilit_engine::{
    AssignOutcome, DeleteOutcome, FonctionRegistry, GrantService, TraceRecorder, guards,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    habilit_db::run_migrations(&db).await.unwrap();
    db
}

fn grant_service(
    db: &Surreal<Db>,
) -> GrantService<SurrealUtilisateurRoleRepository<Db>, SurrealRoleRepository<Db>, SurrealTraceRepository<Db>>
{
    GrantService::new(
        SurrealUtilisateurRoleRepository::new(db.clone()),
        SurrealRoleRepository::new(db.clone()),
        TraceRecorder::new(SurrealTraceRepository::new(db.clone())),
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

// ---------------------------------------------------------------------------
// Grant management
// ---------------------------------------------------------------------------

#[tokio::test]
async fn assign_role_is_idempotent() {
    let db = setup().await;
    let app = create_app(&db, "Pilotage").await;
    let entite = create_entite(&db, "Direction Générale", "DG").await;
    let user = create_user(&db, "jdoe", entite.id).await;
    let role = create_role(&db, "lecteur", app.id).await;
    let actor = create_user(&db, "admin", entite.id).await;

    let service = grant_service(&db);

    let first = service
        .assign_role(user.id, role.id, app.id, actor.id)
        .await
        .unwrap();
    assert_eq!(first, AssignOutcome::Created);

    let second = service
        .assign_role(user.id, role.id, app.id, actor.id)
        .await
        .unwrap();
    assert_eq!(second, AssignOutcome::AlreadyAssigned);

    // Exactly one grant row.
    let grants = SurrealUtilisateurRoleRepository::new(db.clone())
        .list_for_user(user.id)
        .await
        .unwrap();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].role_id, role.id);
    assert_eq!(grants[0].app_id, app.id);
}

#[tokio::test]
async fn assign_role_rejects_application_mismatch() {
    let db = setup().await;
    let app_a = create_app(&db, "Pilotage").await;
    let app_b = create_app(&db, "Reporting").await;
    let entite = create_entite(&db, "Direction Générale", "DG").await;
    let user = create_user(&db, "jdoe", entite.id).await;
    let role = create_role(&db, "lecteur", app_a.id).await;

    let err = grant_service(&db)
        .assign_role(user.id, role.id, app_b.id, user.id)
        .await
        .unwrap_err();
    assert!(matches!(err, HabilitError::Conflict { .. }));

    // Unknown role propagates as NotFound, not a silent deny.
    let err = grant_service(&db)
        .assign_role(user.id, Uuid::new_v4(), app_a.id, user.id)
        .await
        .unwrap_err();
    assert!(matches!(err, HabilitError::NotFound { .. }));
}

#[tokio::test]
async fn remove_role_reports_presence() {
    let db = setup().await;
    let app = create_app(&db, "Pilotage").await;
    let entite = create_entite(&db, "Direction Générale", "DG").await;
    let user = create_user(&db, "jdoe", entite.id).await;
    let role = create_role(&db, "lecteur", app.id).await;

    let service = grant_service(&db);
    service
        .assign_role(user.id, role.id, app.id, user.id)
        .await
        .unwrap();

    assert!(service.remove_role(user.id, role.id, app.id).await.unwrap());
    assert!(!service.remove_role(user.id, role.id, app.id).await.unwrap());
}

#[tokio::test]
async fn delete_role_is_tri_state() {
    let db = setup().await;
    let app = create_app(&db, "Pilotage").await;
    let entite = create_entite(&db, "Direction Générale", "DG").await;
    let user = create_user(&db, "jdoe", entite.id).await;
    let role = create_role(&db, "lecteur", app.id).await;

    let roles = SurrealRoleRepository::new(db.clone());
    let permission = SurrealPermissionRepository::new(db.clone())
        .create(CreatePermission {
            name: "can_read".into(),
            description: "read".into(),
        })
        .await
        .unwrap();
    roles
        .attach_permissions(role.id, &[permission.id])
        .await
        .unwrap();

    let service = grant_service(&db);

    // Unknown role.
    assert_eq!(
        service.delete_role(Uuid::new_v4()).await.unwrap(),
        DeleteOutcome::NotFound
    );

    // Still granted: blocked with the dependent count.
    service
        .assign_role(user.id, role.id, app.id, user.id)
        .await
        .unwrap();
    assert_eq!(
        service.delete_role(role.id).await.unwrap(),
        DeleteOutcome::Blocked { dependents: 1 }
    );

    // After the grant is removed the role goes, along with its
    // role_permission rows.
    service.remove_role(user.id, role.id, app.id).await.unwrap();
    assert_eq!(
        service.delete_role(role.id).await.unwrap(),
        DeleteOutcome::Deleted
    );
    assert!(matches!(
        roles.get_by_id(role.id).await.unwrap_err(),
        HabilitError::NotFound { .. }
    ));
    assert!(roles.permission_ids(role.id).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Mutation guards
// ---------------------------------------------------------------------------

#[tokio::test]
async fn entite_deletion_blocked_by_members() {
    let db = setup().await;
    let entites = SurrealEntiteRepository::new(db.clone());
    let users = SurrealUtilisateurRepository::new(db.clone());
    let entite = create_entite(&db, "Direction Générale", "DG").await;
    let user = create_user(&db, "jdoe", entite.id).await;

    assert_eq!(
        guards::delete_entite(&entites, &users, Uuid::new_v4())
            .await
            .unwrap(),
        DeleteOutcome::NotFound
    );

    assert_eq!(
        guards::delete_entite(&entites, &users, entite.id)
            .await
            .unwrap(),
        DeleteOutcome::Blocked { dependents: 1 }
    );

    users.delete(user.id).await.unwrap();
    assert_eq!(
        guards::delete_entite(&entites, &users, entite.id)
            .await
            .unwrap(),
        DeleteOutcome::Deleted
    );
}

#[tokio::test]
async fn codification_deletion_blocked_by_settings() {
    let db = setup().await;
    let codifications = SurrealCodificationRepository::new(db.clone());
    let settings = SurrealSettingRepository::new(db.clone());
    let entite = create_entite(&db, "Direction Générale", "DG").await;
    let user = create_user(&db, "jdoe", entite.id).await;

    let codification = codifications
        .create(CreateCodification {
            label: "Français".into(),
            param: "LANGUE".into(),
            description: "Langue de l'interface".into(),
        })
        .await
        .unwrap();

    let setting = settings
        .create(CreateSetting {
            utilisateur_id: user.id,
            codification_id: codification.id,
        })
        .await
        .unwrap();

    assert_eq!(
        guards::delete_codification(&codifications, &settings, codification.id)
            .await
            .unwrap(),
        DeleteOutcome::Blocked { dependents: 1 }
    );

    settings.delete(setting.id).await.unwrap();
    assert_eq!(
        guards::delete_codification(&codifications, &settings, codification.id)
            .await
            .unwrap(),
        DeleteOutcome::Deleted
    );
}

#[tokio::test]
async fn application_deletion_blocked_by_roles_and_fonctions() {
    let db = setup().await;
    let applications = SurrealApplicationRepository::new(db.clone());
    let roles = SurrealRoleRepository::new(db.clone());
    let fonctions = SurrealFonctionRepository::new(db.clone());
    let app = create_app(&db, "Pilotage").await;
    let role = create_role(&db, "lecteur", app.id).await;
    let fonction = FonctionRegistry::new(fonctions.clone())
        .ensure_registered(app.id, "export_data", None)
        .await
        .unwrap();

    assert_eq!(
        guards::delete_application(&applications, &roles, &fonctions, app.id)
            .await
            .unwrap(),
        DeleteOutcome::Blocked { dependents: 2 }
    );

    roles.delete(role.id).await.unwrap();
    fonctions.delete(fonction.id).await.unwrap();
    assert_eq!(
        guards::delete_application(&applications, &roles, &fonctions, app.id)
            .await
            .unwrap(),
        DeleteOutcome::Deleted
    );
}

#[tokio::test]
async fn blocked_outcome_converts_to_blocked_error() {
    let outcome = DeleteOutcome::Blocked { dependents: 4 };
    let err = outcome.into_result("entite").unwrap_err();
    assert!(matches!(
        err,
        HabilitError::Blocked { dependents: 4, .. }
    ));
}

// ---------------------------------------------------------------------------
// Operation registry & uniqueness guards
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fonction_registration_is_idempotent() {
    let db = setup().await;
    let app = create_app(&db, "Pilotage").await;
    let fonctions = SurrealFonctionRepository::new(db.clone());
    let registry = FonctionRegistry::new(fonctions.clone());

    let first = registry
        .ensure_registered(app.id, "export_data", Some("Exporter les données"))
        .await
        .unwrap();
    let second = registry
        .ensure_registered(app.id, "export_data", None)
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.description, "Exporter les données");
    assert_eq!(fonctions.count_by_app(app.id).await.unwrap(), 1);
}

#[tokio::test]
async fn uniqueness_violations_surface_as_conflict() {
    let db = setup().await;
    let app_a = create_app(&db, "Pilotage").await;
    let app_b = create_app(&db, "Reporting").await;
    let entite = create_entite(&db, "Direction Générale", "DG").await;
    create_user(&db, "jdoe", entite.id).await;

    // Entite name and code are global.
    let err = SurrealEntiteRepository::new(db.clone())
        .create(CreateEntite {
            name: "Direction Générale".into(),
            code: "DG2".into(),
            email: "dg2@example.org".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, HabilitError::Conflict { .. }));

    // Login is global.
    let err = SurrealUtilisateurRepository::new(db.clone())
        .create(CreateUtilisateur {
            last_name: "Doe".into(),
            first_name: "John".into(),
            login: "jdoe".into(),
            email: "john@example.org".into(),
            status: UserStatus::Active,
            expires_at: None,
            profile: "Agent".into(),
            entite_id: entite.id,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, HabilitError::Conflict { .. }));

    // Role names are unique per application, not globally.
    create_role(&db, "lecteur", app_a.id).await;
    let err = SurrealRoleRepository::new(db.clone())
        .create(CreateRole {
            name: "lecteur".into(),
            description: "duplicate".into(),
            app_id: app_a.id,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, HabilitError::Conflict { .. }));
    create_role(&db, "lecteur", app_b.id).await;
}

// ---------------------------------------------------------------------------
// Cascades & traces
// ---------------------------------------------------------------------------

#[tokio::test]
async fn user_deletion_cascades_to_dependents() {
    let db = setup().await;
    let app = create_app(&db, "Pilotage").await;
    let entite = create_entite(&db, "Direction Générale", "DG").await;
    let user = create_user(&db, "jdoe", entite.id).await;
    let role = create_role(&db, "lecteur", app.id).await;

    let users = SurrealUtilisateurRepository::new(db.clone());
    let grants = SurrealUtilisateurRoleRepository::new(db.clone());
    let settings = SurrealSettingRepository::new(db.clone());
    let objectifs = SurrealObjectifRepository::new(db.clone());

    grants.assign(user.id, role.id, app.id).await.unwrap();

    let codification = SurrealCodificationRepository::new(db.clone())
        .create(CreateCodification {
            label: "Français".into(),
            param: "LANGUE".into(),
            description: "Langue".into(),
        })
        .await
        .unwrap();
    settings
        .create(CreateSetting {
            utilisateur_id: user.id,
            codification_id: codification.id,
        })
        .await
        .unwrap();

    objectifs
        .create(CreateObjectif {
            title: "Objectif".into(),
            description: "test".into(),
            kind: "individuel".into(),
            period: "2026".into(),
            start_date: Utc::now(),
            end_date: Utc::now() + Duration::days(30),
            value: None,
            utilisateur_id: user.id,
        })
        .await
        .unwrap();

    users.delete(user.id).await.unwrap();

    assert!(matches!(
        users.get_by_id(user.id).await.unwrap_err(),
        HabilitError::NotFound { .. }
    ));
    assert!(grants.list_for_user(user.id).await.unwrap().is_empty());
    assert!(settings.list_by_user(user.id).await.unwrap().is_empty());
    let owned = objectifs
        .list_by_owner(user.id, Pagination::default())
        .await
        .unwrap();
    assert_eq!(owned.total, 0);
}

#[tokio::test]
async fn grant_mutations_and_decisions_emit_traces() {
    let db = setup().await;
    let app = create_app(&db, "Pilotage").await;
    let entite = create_entite(&db, "Direction Générale", "DG").await;
    let user = create_user(&db, "jdoe", entite.id).await;
    let role = create_role(&db, "lecteur", app.id).await;

    let traces = SurrealTraceRepository::new(db.clone());
    let recorder = TraceRecorder::new(traces.clone());

    grant_service(&db)
        .assign_role(user.id, role.id, app.id, user.id)
        .await
        .unwrap();

    recorder
        .record_decision(
            user.id,
            app.id,
            "export_data",
            &habilit_engine::Decision::Allow,
        )
        .await;

    let page = traces.list(Pagination::default()).await.unwrap();
    assert_eq!(page.total, 2);

    let actions: Vec<&str> = page.items.iter().map(|t| t.action.as_str()).collect();
    assert!(actions.contains(&"ROLE_ASSIGN"));
    assert!(actions.contains(&"ACCESS_CHECK"));

    let access = page
        .items
        .iter()
        .find(|t| t.action == "ACCESS_CHECK")
        .unwrap();
    assert_eq!(access.utilisateur_id, Some(user.id));
    let param = access.param.as_ref().unwrap();
    assert_eq!(param["outcome"], "allow");
}

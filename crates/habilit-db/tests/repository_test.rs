//! Integration tests for the core repositories using in-memory
//! SurrealDB.

use habilit_core::HabilitError;
use habilit_core::models::application::{CreateApplication, UpdateApplication};
use habilit_core::models::codification::{CreateCodification, UpdateCodification};
use habilit_core::models::entite::{CreateEntite, UpdateEntite};
use habilit_core::models::fonction::CreateFonction;
use habilit_core::models::permission::CreatePermission;
use habilit_core::models::utilisateur::{CreateUtilisateur, UserStatus};
use habilit_core::repository::{
    ApplicationRepository, CodificationRepository, EntiteRepository, FonctionRepository,
    Pagination, PermissionRepository, UtilisateurRepository,
};
use habilit_db::repository::{
    SurrealApplicationRepository, SurrealCodificationRepository, SurrealEntiteRepository,
    SurrealFonctionRepository, SurrealPermissionRepository, SurrealUtilisateurRepository,
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

#[tokio::test]
async fn application_crud_round_trip() {
    let db = setup().await;
    let repo = SurrealApplicationRepository::new(db);

    let app = repo
        .create(CreateApplication {
            name: "Pilotage".into(),
            description: "Suivi des objectifs".into(),
            color: "#0055a4".into(),
            icon: Some("chart".into()),
        })
        .await
        .unwrap();

    let fetched = repo.get_by_id(app.id).await.unwrap();
    assert_eq!(fetched.name, "Pilotage");
    assert_eq!(fetched.icon.as_deref(), Some("chart"));

    let updated = repo
        .update(
            app.id,
            UpdateApplication {
                name: Some("Pilotage v2".into()),
                icon: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Pilotage v2");
    assert_eq!(updated.icon, None);

    let page = repo.list(Pagination::default()).await.unwrap();
    assert_eq!(page.total, 1);

    repo.delete(app.id).await.unwrap();
    assert!(matches!(
        repo.get_by_id(app.id).await.unwrap_err(),
        HabilitError::NotFound { .. }
    ));
}

#[tokio::test]
async fn entite_lookup_and_uniqueness() {
    let db = setup().await;
    let repo = SurrealEntiteRepository::new(db);

    let entite = repo
        .create(CreateEntite {
            name: "Direction Informatique".into(),
            code: "DSI".into(),
            email: "dsi@example.org".into(),
        })
        .await
        .unwrap();

    let by_code = repo.get_by_code("DSI").await.unwrap();
    assert_eq!(by_code.id, entite.id);

    // Updating to a free code is fine; stealing a taken one is not.
    repo.create(CreateEntite {
        name: "Direction Générale".into(),
        code: "DG".into(),
        email: "dg@example.org".into(),
    })
    .await
    .unwrap();

    let err = repo
        .update(
            entite.id,
            UpdateEntite {
                code: Some("DG".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, HabilitError::Conflict { .. }));

    // Re-saving its own code is not a conflict.
    let same = repo
        .update(
            entite.id,
            UpdateEntite {
                code: Some("DSI".into()),
                email: Some("info@example.org".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(same.email, "info@example.org");
}

#[tokio::test]
async fn utilisateur_login_lookup_and_status() {
    let db = setup().await;
    let entites = SurrealEntiteRepository::new(db.clone());
    let repo = SurrealUtilisateurRepository::new(db);

    let entite = entites
        .create(CreateEntite {
            name: "Direction Générale".into(),
            code: "DG".into(),
            email: "dg@example.org".into(),
        })
        .await
        .unwrap();

    let user = repo
        .create(CreateUtilisateur {
            last_name: "Martin".into(),
            first_name: "Claire".into(),
            login: "cmartin".into(),
            email: "cmartin@example.org".into(),
            status: UserStatus::Pending,
            expires_at: None,
            profile: "Agent".into(),
            entite_id: entite.id,
        })
        .await
        .unwrap();

    let by_login = repo.get_by_login("cmartin").await.unwrap();
    assert_eq!(by_login.id, user.id);
    assert_eq!(by_login.status, UserStatus::Pending);
    assert_eq!(by_login.entite_id, entite.id);

    let activated = repo.update_status(user.id, UserStatus::Active).await.unwrap();
    assert_eq!(activated.status, UserStatus::Active);

    assert_eq!(repo.count_by_entite(entite.id).await.unwrap(), 1);
    let ids = repo.ids_in_entite(entite.id).await.unwrap();
    assert_eq!(ids, vec![user.id]);
}

#[tokio::test]
async fn permission_name_is_global_and_unique() {
    let db = setup().await;
    let repo = SurrealPermissionRepository::new(db);

    let permission = repo
        .create(CreatePermission {
            name: "can_read".into(),
            description: "read access".into(),
        })
        .await
        .unwrap();

    let by_name = repo.get_by_name("can_read").await.unwrap();
    assert_eq!(by_name.id, permission.id);

    let err = repo
        .create(CreatePermission {
            name: "can_read".into(),
            description: "duplicate".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, HabilitError::Conflict { .. }));
}

#[tokio::test]
async fn fonction_permissions_attach_and_detach() {
    let db = setup().await;
    let applications = SurrealApplicationRepository::new(db.clone());
    let permissions = SurrealPermissionRepository::new(db.clone());
    let repo = SurrealFonctionRepository::new(db);

    let app = applications
        .create(CreateApplication {
            name: "Pilotage".into(),
            description: "test".into(),
            color: "#0055a4".into(),
            icon: None,
        })
        .await
        .unwrap();

    let fonction = repo
        .create(CreateFonction {
            name: "export_data".into(),
            description: "Exporter".into(),
            app_id: app.id,
        })
        .await
        .unwrap();

    let p1 = permissions
        .create(CreatePermission {
            name: "can_read".into(),
            description: "read".into(),
        })
        .await
        .unwrap();
    let p2 = permissions
        .create(CreatePermission {
            name: "can_write".into(),
            description: "write".into(),
        })
        .await
        .unwrap();

    // Attaching twice does not duplicate the pair.
    repo.attach_permissions(fonction.id, &[p1.id, p2.id])
        .await
        .unwrap();
    repo.attach_permissions(fonction.id, &[p1.id]).await.unwrap();

    let mut ids = repo.permission_ids(fonction.id).await.unwrap();
    ids.sort();
    let mut expected = vec![p1.id, p2.id];
    expected.sort();
    assert_eq!(ids, expected);

    repo.detach_permissions(fonction.id, &[p1.id]).await.unwrap();
    assert_eq!(repo.permission_ids(fonction.id).await.unwrap(), vec![p2.id]);

    // Deleting the fonction removes the remaining join rows.
    repo.delete(fonction.id).await.unwrap();
    assert!(repo.permission_ids(fonction.id).await.unwrap().is_empty());
    assert!(matches!(
        repo.get_by_name(app.id, "export_data").await.unwrap_err(),
        HabilitError::NotFound { .. }
    ));
}

#[tokio::test]
async fn fonction_names_are_scoped_per_application() {
    let db = setup().await;
    let applications = SurrealApplicationRepository::new(db.clone());
    let repo = SurrealFonctionRepository::new(db);

    let app_a = applications
        .create(CreateApplication {
            name: "Pilotage".into(),
            description: "test".into(),
            color: "#0055a4".into(),
            icon: None,
        })
        .await
        .unwrap();
    let app_b = applications
        .create(CreateApplication {
            name: "Reporting".into(),
            description: "test".into(),
            color: "#9b2226".into(),
            icon: None,
        })
        .await
        .unwrap();

    repo.create(CreateFonction {
        name: "export_data".into(),
        description: "Exporter".into(),
        app_id: app_a.id,
    })
    .await
    .unwrap();

    // Same name in another application is fine.
    repo.create(CreateFonction {
        name: "export_data".into(),
        description: "Exporter".into(),
        app_id: app_b.id,
    })
    .await
    .unwrap();

    // Same name in the same application conflicts.
    let err = repo
        .create(CreateFonction {
            name: "export_data".into(),
            description: "Exporter".into(),
            app_id: app_a.id,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, HabilitError::Conflict { .. }));

    assert_eq!(repo.count_by_app(app_a.id).await.unwrap(), 1);
    assert_eq!(repo.count_by_app(app_b.id).await.unwrap(), 1);

    // Unknown lookups stay NotFound.
    assert!(matches!(
        repo.get_by_name(Uuid::new_v4(), "export_data")
            .await
            .unwrap_err(),
        HabilitError::NotFound { .. }
    ));
}

#[tokio::test]
async fn codification_search_matches_all_columns() {
    let db = setup().await;
    let repo = SurrealCodificationRepository::new(db);

    repo.create(CreateCodification {
        label: "Français".into(),
        param: "LANGUE".into(),
        description: "Langue de l'interface".into(),
    })
    .await
    .unwrap();
    repo.create(CreateCodification {
        label: "Anglais".into(),
        param: "LANGUE".into(),
        description: "Langue de l'interface".into(),
    })
    .await
    .unwrap();
    let theme = repo
        .create(CreateCodification {
            label: "Sombre".into(),
            param: "THEME".into(),
            description: "Thème d'affichage".into(),
        })
        .await
        .unwrap();

    let by_param = repo.search("langue", Pagination::default()).await.unwrap();
    assert_eq!(by_param.total, 2);

    let by_label = repo.search("sombre", Pagination::default()).await.unwrap();
    assert_eq!(by_label.total, 1);
    assert_eq!(by_label.items[0].id, theme.id);

    // The (param, label) pair is unique.
    let err = repo
        .create(CreateCodification {
            label: "Sombre".into(),
            param: "THEME".into(),
            description: "duplicate".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, HabilitError::Conflict { .. }));

    // Changing only the label away from the collision is accepted.
    let renamed = repo
        .update(
            theme.id,
            UpdateCodification {
                label: Some("Clair".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.label, "Clair");
}

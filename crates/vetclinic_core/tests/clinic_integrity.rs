use rusqlite::Connection;
use vetclinic_core::db::open_db_in_memory;
use vetclinic_core::{
    AnimalPatch, AppointmentCascadePatch, AppointmentPatch, ClinicError, ClinicService, Entity,
    EntityKind, GuardianPatch, NewAnimal, NewAppointment, NewGuardian, MAX_EXPLICIT_ID,
};

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn maria_rex_appointment_scenario() {
    let mut conn = setup();
    let mut service = ClinicService::try_new(&mut conn).unwrap();

    let maria = service.create_guardian(&NewGuardian::named("Maria")).unwrap();
    let rex = service
        .create_animal(&NewAnimal::new("Rex", "Cachorro", maria.id))
        .unwrap();
    let visit = service
        .create_appointment(&NewAppointment::new("14-06-2025 10:00", "Dr. João", rex.id))
        .unwrap();
    assert_eq!((maria.id, rex.id, visit.id), (1, 1, 1));

    let loaded = service.get_by_id(EntityKind::Appointment, 1).unwrap();
    assert_eq!(loaded.kind(), EntityKind::Appointment);
    let Entity::Appointment(record) = loaded else {
        panic!("expected an appointment record");
    };
    assert_eq!(record.veterinarian, "Dr. João");
    assert_eq!(record.animal_label(), "Rex");
    assert_eq!(record.guardian_label(), "Maria");
    assert_eq!(record.guardian_id, Some(1));
}

#[test]
fn created_animal_reads_back_equal() {
    let mut conn = setup();
    let mut service = ClinicService::try_new(&mut conn).unwrap();

    let guardian = service.create_guardian(&NewGuardian::named("Ana")).unwrap();
    let created = service
        .create_animal(&NewAnimal::new("  Mia ", "Gato", guardian.id))
        .unwrap();
    assert_eq!(created.name, "Mia");

    let loaded = service.get_animal(created.id).unwrap();
    assert_eq!(loaded.to_animal(), created);
    assert_eq!(loaded.guardian_label(), "Ana");
}

#[test]
fn create_animal_with_unknown_guardian_fails_with_not_found() {
    let mut conn = setup();
    let mut service = ClinicService::try_new(&mut conn).unwrap();

    let err = service
        .create_animal(&NewAnimal::new("Rex", "Cachorro", 999))
        .unwrap_err();
    assert!(matches!(
        err,
        ClinicError::NotFound {
            kind: EntityKind::Guardian,
            ..
        }
    ));
    assert!(err.is_client_error());
    drop(service);
    assert_eq!(count(&conn, "animals"), 0);
}

#[test]
fn create_appointment_with_unknown_animal_fails_with_not_found() {
    let mut conn = setup();
    let mut service = ClinicService::try_new(&mut conn).unwrap();

    let err = service
        .create_appointment(&NewAppointment::new("14-06-2025 10:00", "Dr. João", 5))
        .unwrap_err();
    assert!(matches!(
        err,
        ClinicError::NotFound {
            kind: EntityKind::Animal,
            ..
        }
    ));
}

#[test]
fn create_appointment_rejects_malformed_date_as_client_error() {
    let mut conn = setup();
    let mut service = ClinicService::try_new(&mut conn).unwrap();
    let guardian = service.create_guardian(&NewGuardian::named("Maria")).unwrap();
    let animal = service
        .create_animal(&NewAnimal::new("Rex", "Cachorro", guardian.id))
        .unwrap();

    for text in ["31-02-2025 10:00", "2025-06-14 10:00"] {
        let err = service
            .create_appointment(&NewAppointment::new(text, "Dr. João", animal.id))
            .unwrap_err();
        assert!(
            matches!(err, ClinicError::InvalidFormat { field: "scheduled_at", .. }),
            "unexpected error for `{text}`: {err}"
        );
        assert!(err.is_client_error());
    }
}

#[test]
fn missing_fields_are_reported_before_any_write() {
    let mut conn = setup();
    let mut service = ClinicService::try_new(&mut conn).unwrap();

    let err = service.create_guardian(&NewGuardian::default()).unwrap_err();
    assert!(matches!(
        err,
        ClinicError::MissingField {
            kind: EntityKind::Guardian,
            field: "name"
        }
    ));

    let err = service
        .create_appointment(&NewAppointment {
            scheduled_at: Some("14-06-2025 10:00".to_string()),
            veterinarian: Some("Dr. João".to_string()),
            ..NewAppointment::default()
        })
        .unwrap_err();
    assert!(matches!(
        err,
        ClinicError::MissingField {
            field: "animal_id",
            ..
        }
    ));
}

#[test]
fn caller_supplied_ids_must_not_collide() {
    let mut conn = setup();
    let mut service = ClinicService::try_new(&mut conn).unwrap();

    let draft = NewGuardian {
        id: Some(7),
        name: Some("Maria".to_string()),
    };
    assert_eq!(service.create_guardian(&draft).unwrap().id, 7);

    let err = service.create_guardian(&draft).unwrap_err();
    assert!(matches!(err, ClinicError::DuplicateId(EntityKind::Guardian, 7)));

    let animal = NewAnimal {
        id: Some(3),
        ..NewAnimal::new("Rex", "Cachorro", 7)
    };
    service.create_animal(&animal).unwrap();
    let err = service.create_animal(&animal).unwrap_err();
    assert!(matches!(err, ClinicError::DuplicateId(EntityKind::Animal, 3)));

    // Generated ids continue after the largest explicit one.
    let next = service.create_guardian(&NewGuardian::named("Ana")).unwrap();
    assert_eq!(next.id, 8);
}

#[test]
fn deleting_guardian_cascades_to_all_animals_and_appointments() {
    const ANIMALS: usize = 3;
    const APPOINTMENTS_PER_ANIMAL: usize = 4;

    let mut conn = setup();
    let mut service = ClinicService::try_new(&mut conn).unwrap();
    let guardian = service.create_guardian(&NewGuardian::named("Maria")).unwrap();
    let bystander = service.create_guardian(&NewGuardian::named("Ana")).unwrap();
    let kept_animal = service
        .create_animal(&NewAnimal::new("Bob", "Peixe", bystander.id))
        .unwrap();
    let kept_visit = service
        .create_appointment(&NewAppointment::new("01-07-2025 09:00", "Dra. Paula", kept_animal.id))
        .unwrap();

    let mut animal_ids = Vec::new();
    let mut appointment_ids = Vec::new();
    for a in 0..ANIMALS {
        let animal = service
            .create_animal(&NewAnimal::new(format!("Pet {a}"), "Gato", guardian.id))
            .unwrap();
        for m in 0..APPOINTMENTS_PER_ANIMAL {
            let visit = service
                .create_appointment(&NewAppointment::new(
                    format!("1{m}-06-2025 0{a}:30"),
                    "Dr. João",
                    animal.id,
                ))
                .unwrap();
            appointment_ids.push(visit.id);
        }
        animal_ids.push(animal.id);
    }

    let report = service.delete_guardian(guardian.id).unwrap();
    assert_eq!(report.guardians, vec![guardian.id]);
    assert_eq!(report.animals.len(), ANIMALS);
    assert_eq!(report.appointments.len(), ANIMALS * APPOINTMENTS_PER_ANIMAL);

    assert!(matches!(
        service.get_guardian(guardian.id),
        Err(ClinicError::NotFound { .. })
    ));
    for id in animal_ids {
        assert!(matches!(
            service.get_by_id(EntityKind::Animal, id),
            Err(ClinicError::NotFound { .. })
        ));
    }
    for id in appointment_ids {
        assert!(matches!(
            service.get_by_id(EntityKind::Appointment, id),
            Err(ClinicError::NotFound { .. })
        ));
    }

    assert_eq!(service.get_appointment(kept_visit.id).unwrap().animal_label(), "Bob");
    drop(service);
    assert_eq!(count(&conn, "guardians"), 1);
    assert_eq!(count(&conn, "animals"), 1);
    assert_eq!(count(&conn, "appointments"), 1);
}

#[test]
fn deleting_animal_cascades_to_its_appointments_only() {
    let mut conn = setup();
    let mut service = ClinicService::try_new(&mut conn).unwrap();
    let guardian = service.create_guardian(&NewGuardian::named("Maria")).unwrap();
    let rex = service
        .create_animal(&NewAnimal::new("Rex", "Cachorro", guardian.id))
        .unwrap();
    let mia = service
        .create_animal(&NewAnimal::new("Mia", "Gato", guardian.id))
        .unwrap();
    service
        .create_appointment(&NewAppointment::new("14-06-2025 10:00", "Dr. João", rex.id))
        .unwrap();
    let mia_visit = service
        .create_appointment(&NewAppointment::new("14-06-2025 11:00", "Dr. João", mia.id))
        .unwrap();

    let report = service.delete_animal(rex.id).unwrap();
    assert!(report.guardians.is_empty());
    assert_eq!(report.animals, vec![rex.id]);
    assert_eq!(report.appointments.len(), 1);

    assert!(service.get_guardian(guardian.id).is_ok());
    assert!(service.get_appointment(mia_visit.id).is_ok());
}

#[test]
fn deleting_missing_records_fails_with_not_found() {
    let mut conn = setup();
    let mut service = ClinicService::try_new(&mut conn).unwrap();

    assert!(matches!(
        service.delete_guardian(1),
        Err(ClinicError::NotFound {
            kind: EntityKind::Guardian,
            ..
        })
    ));
    assert!(matches!(
        service.delete_animal(1),
        Err(ClinicError::NotFound {
            kind: EntityKind::Animal,
            ..
        })
    ));
    assert!(matches!(
        service.delete_appointment(1),
        Err(ClinicError::NotFound {
            kind: EntityKind::Appointment,
            ..
        })
    ));
}

#[test]
fn storage_fault_during_cascade_delete_rolls_back_everything() {
    let mut conn = setup();
    {
        let mut service = ClinicService::try_new(&mut conn).unwrap();
        let guardian = service.create_guardian(&NewGuardian::named("Maria")).unwrap();
        let animal = service
            .create_animal(&NewAnimal::new("Rex", "Cachorro", guardian.id))
            .unwrap();
        service
            .create_appointment(&NewAppointment::new("14-06-2025 10:00", "Dr. João", animal.id))
            .unwrap();
    }
    // Fails the last step of the cascade, after dependents are gone.
    conn.execute_batch(
        "CREATE TRIGGER block_guardian_delete BEFORE DELETE ON guardians
         BEGIN SELECT RAISE(ABORT, 'guardian delete blocked'); END;",
    )
    .unwrap();

    let mut service = ClinicService::try_new(&mut conn).unwrap();
    let err = service.delete_guardian(1).unwrap_err();
    assert!(matches!(err, ClinicError::StorageFailure(_)));
    assert!(!err.is_client_error());
    drop(service);

    assert_eq!(count(&conn, "guardians"), 1);
    assert_eq!(count(&conn, "animals"), 1);
    assert_eq!(count(&conn, "appointments"), 1);
}

#[test]
fn cascading_update_touches_only_supplied_fields() {
    let mut conn = setup();
    let mut service = ClinicService::try_new(&mut conn).unwrap();
    let guardian = service.create_guardian(&NewGuardian::named("Maria")).unwrap();
    let rex = service
        .create_animal(&NewAnimal::new("Rex", "Cachorro", guardian.id))
        .unwrap();
    let visit = service
        .create_appointment(&NewAppointment::new("14-06-2025 10:00", "Dr. João", rex.id))
        .unwrap();

    let patch = AppointmentCascadePatch {
        appointment: AppointmentPatch {
            veterinarian: Some("Dr. Francisco".to_string()),
            ..AppointmentPatch::default()
        },
        animal: Some(AnimalPatch {
            species: Some("Gato".to_string()),
            ..AnimalPatch::default()
        }),
        guardian: None,
    };
    let updated = service.update_appointment_cascading(visit.id, &patch).unwrap();

    assert_eq!(updated.veterinarian, "Dr. Francisco");
    assert_eq!(updated.scheduled_at, visit.scheduled_at);
    assert_eq!(updated.animal_label(), "Rex");

    let animal = service.get_animal(rex.id).unwrap();
    assert_eq!(animal.name, "Rex");
    assert_eq!(animal.species, "Gato");
    assert_eq!(service.get_guardian(guardian.id).unwrap().name, "Maria");
}

#[test]
fn cascading_update_reaches_the_guardian() {
    let mut conn = setup();
    let mut service = ClinicService::try_new(&mut conn).unwrap();
    let guardian = service.create_guardian(&NewGuardian::named("Maria")).unwrap();
    let rex = service
        .create_animal(&NewAnimal::new("Rex", "Cachorro", guardian.id))
        .unwrap();
    let visit = service
        .create_appointment(&NewAppointment::new("14-06-2025 10:00", "Dr. João", rex.id))
        .unwrap();

    let patch: AppointmentCascadePatch = serde_json::from_str(
        r#"{"scheduled_at":"15-06-2025 08:15","guardian":{"name":"Maria Silva"}}"#,
    )
    .unwrap();
    let updated = service.update_appointment_cascading(visit.id, &patch).unwrap();

    assert_eq!(vetclinic_core::temporal::format(&updated.scheduled_at), "15-06-2025 08:15");
    assert_eq!(updated.guardian_label(), "Maria Silva");
    assert_eq!(updated.veterinarian, "Dr. João");
}

#[test]
fn failed_cascading_update_rolls_back_earlier_sub_updates() {
    let mut conn = setup();
    let mut service = ClinicService::try_new(&mut conn).unwrap();
    let guardian = service.create_guardian(&NewGuardian::named("Maria")).unwrap();
    let rex = service
        .create_animal(&NewAnimal::new("Rex", "Cachorro", guardian.id))
        .unwrap();
    let visit = service
        .create_appointment(&NewAppointment::new("14-06-2025 10:00", "Dr. João", rex.id))
        .unwrap();

    let patch = AppointmentCascadePatch {
        appointment: AppointmentPatch {
            veterinarian: Some("Dr. Francisco".to_string()),
            ..AppointmentPatch::default()
        },
        animal: Some(AnimalPatch {
            species: Some("Gato".to_string()),
            ..AnimalPatch::default()
        }),
        guardian: Some(GuardianPatch {
            name: Some("   ".to_string()),
        }),
    };
    let err = service
        .update_appointment_cascading(visit.id, &patch)
        .unwrap_err();
    assert!(matches!(err, ClinicError::MissingField { .. }));

    let appointment = service.get_appointment(visit.id).unwrap();
    assert_eq!(appointment.veterinarian, "Dr. João");
    assert_eq!(service.get_animal(rex.id).unwrap().species, "Cachorro");
}

#[test]
fn cascading_update_of_missing_appointment_fails_with_not_found() {
    let mut conn = setup();
    let mut service = ClinicService::try_new(&mut conn).unwrap();

    let err = service
        .update_appointment_cascading(42, &AppointmentCascadePatch::default())
        .unwrap_err();
    assert!(matches!(
        err,
        ClinicError::NotFound {
            kind: EntityKind::Appointment,
            ..
        }
    ));
}

#[test]
fn relinking_requires_existing_parent() {
    let mut conn = setup();
    let mut service = ClinicService::try_new(&mut conn).unwrap();
    let maria = service.create_guardian(&NewGuardian::named("Maria")).unwrap();
    let ana = service.create_guardian(&NewGuardian::named("Ana")).unwrap();
    let rex = service
        .create_animal(&NewAnimal::new("Rex", "Cachorro", maria.id))
        .unwrap();

    let err = service
        .update_animal(
            rex.id,
            &AnimalPatch {
                guardian_id: Some(999),
                ..AnimalPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ClinicError::NotFound {
            kind: EntityKind::Guardian,
            ..
        }
    ));

    let moved = service
        .update_animal(
            rex.id,
            &AnimalPatch {
                guardian_id: Some(ana.id),
                ..AnimalPatch::default()
            },
        )
        .unwrap();
    assert_eq!(moved.guardian_label(), "Ana");
    assert_eq!(moved.name, "Rex");
}

#[test]
fn single_entity_updates_keep_unspecified_fields() {
    let mut conn = setup();
    let mut service = ClinicService::try_new(&mut conn).unwrap();
    let guardian = service.create_guardian(&NewGuardian::named("Maria")).unwrap();
    let rex = service
        .create_animal(&NewAnimal::new("Rex", "Cachorro", guardian.id))
        .unwrap();
    let visit = service
        .create_appointment(&NewAppointment::new("14-06-2025 10:00", "Dr. João", rex.id))
        .unwrap();

    let renamed = service
        .update_guardian(
            guardian.id,
            &GuardianPatch {
                name: Some("Maria Souza".to_string()),
            },
        )
        .unwrap();
    assert_eq!(renamed.name, "Maria Souza");

    let moved = service
        .update_appointment(
            visit.id,
            &AppointmentPatch {
                scheduled_at: Some("20-06-2025 16:45".to_string()),
                ..AppointmentPatch::default()
            },
        )
        .unwrap();
    assert_eq!(moved.veterinarian, "Dr. João");
    assert_eq!(moved.guardian_label(), "Maria Souza");

    let err = service
        .update_appointment(
            visit.id,
            &AppointmentPatch {
                scheduled_at: Some("20/06/2025 16:45".to_string()),
                ..AppointmentPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, ClinicError::InvalidFormat { .. }));
    assert_eq!(
        service.get_appointment(visit.id).unwrap().scheduled_at,
        moved.scheduled_at
    );
}

#[test]
fn caller_supplied_ids_must_be_in_range() {
    let mut conn = setup();
    let mut service = ClinicService::try_new(&mut conn).unwrap();

    for id in [0, -5, i64::MAX] {
        let err = service
            .create_guardian(&NewGuardian {
                id: Some(id),
                name: Some("Maria".to_string()),
            })
            .unwrap_err();
        assert!(matches!(err, ClinicError::InvalidId(EntityKind::Guardian, bad) if bad == id));
        assert!(err.is_client_error());
        assert_eq!(err.code(), "invalid_id");
    }

    let guardian = service.create_guardian(&NewGuardian::named("Maria")).unwrap();
    let animal = service
        .create_animal(&NewAnimal::new("Rex", "Cachorro", guardian.id))
        .unwrap();
    let err = service
        .create_appointment(&NewAppointment {
            id: Some(-1),
            ..NewAppointment::new("14-06-2025 10:00", "Dr. João", animal.id)
        })
        .unwrap_err();
    assert!(matches!(err, ClinicError::InvalidId(EntityKind::Appointment, -1)));

    drop(service);
    assert_eq!(count(&conn, "guardians"), 1);
    assert_eq!(count(&conn, "appointments"), 0);
}

#[test]
fn generated_ids_still_work_after_largest_explicit_id() {
    let mut conn = setup();
    let mut service = ClinicService::try_new(&mut conn).unwrap();

    let explicit = service
        .create_guardian(&NewGuardian {
            id: Some(MAX_EXPLICIT_ID),
            name: Some("Maria".to_string()),
        })
        .unwrap();
    assert_eq!(explicit.id, MAX_EXPLICIT_ID);

    let generated = service.create_guardian(&NewGuardian::named("Ana")).unwrap();
    assert_eq!(generated.id, i64::MAX);

    let animal = service
        .create_animal(&NewAnimal::new("Rex", "Cachorro", generated.id))
        .unwrap();
    assert_eq!(animal.id, 1);
}

#[test]
fn appointment_relink_to_missing_animal_leaves_row_unchanged() {
    let mut conn = setup();
    let mut service = ClinicService::try_new(&mut conn).unwrap();
    let guardian = service.create_guardian(&NewGuardian::named("Maria")).unwrap();
    let rex = service
        .create_animal(&NewAnimal::new("Rex", "Cachorro", guardian.id))
        .unwrap();
    let visit = service
        .create_appointment(&NewAppointment::new("14-06-2025 10:00", "Dr. João", rex.id))
        .unwrap();

    let err = service
        .update_appointment(
            visit.id,
            &AppointmentPatch {
                animal_id: Some(999),
                veterinarian: Some("Dr. Francisco".to_string()),
                ..AppointmentPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ClinicError::NotFound {
            kind: EntityKind::Animal,
            ..
        }
    ));

    let unchanged = service.get_appointment(visit.id).unwrap();
    assert_eq!(unchanged.to_appointment(), visit);
    assert_eq!(unchanged.animal_label(), "Rex");
}

#[test]
fn cascading_update_patches_the_newly_linked_animal() {
    let mut conn = setup();
    let mut service = ClinicService::try_new(&mut conn).unwrap();
    let guardian = service.create_guardian(&NewGuardian::named("Maria")).unwrap();
    let rex = service
        .create_animal(&NewAnimal::new("Rex", "Cachorro", guardian.id))
        .unwrap();
    let mia = service
        .create_animal(&NewAnimal::new("Mia", "Gato", guardian.id))
        .unwrap();
    let visit = service
        .create_appointment(&NewAppointment::new("14-06-2025 10:00", "Dr. João", rex.id))
        .unwrap();

    let patch = AppointmentCascadePatch {
        appointment: AppointmentPatch {
            animal_id: Some(mia.id),
            ..AppointmentPatch::default()
        },
        animal: Some(AnimalPatch {
            name: Some("Mimi".to_string()),
            ..AnimalPatch::default()
        }),
        guardian: None,
    };
    let updated = service.update_appointment_cascading(visit.id, &patch).unwrap();

    assert_eq!(updated.animal_id, mia.id);
    assert_eq!(updated.animal_label(), "Mimi");
    assert_eq!(service.get_animal(mia.id).unwrap().species, "Gato");

    let untouched = service.get_animal(rex.id).unwrap();
    assert_eq!(untouched.to_animal(), rex);
}

use chrono::NaiveDate;
use fitdash::{
    FileStorage, InMemoryStorage, Member, MemberDraft, MemberPatch, MemberStatus,
    PersistedCollection, Record, StorageExt,
};

fn draft(name: &str) -> MemberDraft {
    MemberDraft {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        phone: None,
        plan: None,
        joined_on: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        status: None,
    }
}

#[test]
fn added_record_survives_a_fresh_instance() {
    let storage = InMemoryStorage::new();
    let members = PersistedCollection::<_, Member>::open(storage.clone());
    let created = members.add(draft("A")).unwrap();

    let fresh = PersistedCollection::<_, Member>::open(storage);
    let first = fresh.load();
    let second = fresh.load();

    assert_eq!(first.len(), 1);
    assert_eq!(first[0].name, "A");
    assert_eq!(first[0].id(), created.id());
    assert_eq!(first[0].id(), second[0].id());
}

#[test]
fn newest_first_and_order_survives_reload() {
    let storage = InMemoryStorage::new();
    let members = PersistedCollection::<_, Member>::open(storage.clone());
    let r1 = members.add(draft("R1")).unwrap();
    let r2 = members.add(draft("R2")).unwrap();

    assert_eq!(members.list(), vec![r2.clone(), r1.clone()]);
    let reopened = PersistedCollection::<_, Member>::open(storage);
    assert_eq!(reopened.list(), vec![r2, r1]);
}

#[test]
fn unknown_ids_leave_the_list_alone() {
    let members = PersistedCollection::<_, Member>::open(InMemoryStorage::new());
    members.add(draft("Kept")).unwrap();
    let before = members.list();

    members
        .update(
            "nonexistent-id",
            &MemberPatch {
                status: Some(MemberStatus::Expired),
                ..Default::default()
            },
        )
        .unwrap();
    members.remove("nonexistent-id").unwrap();

    assert_eq!(members.list(), before);
}

#[test]
fn update_keeps_unset_fields() {
    let members = PersistedCollection::<_, Member>::open(InMemoryStorage::new());
    let member = members.add(draft("Dee")).unwrap();

    members
        .update(
            member.id(),
            &MemberPatch {
                phone: Some(Some("555-0101".into())),
                ..Default::default()
            },
        )
        .unwrap();

    let updated = members.get(member.id()).unwrap();
    assert_eq!(updated.phone.as_deref(), Some("555-0101"));
    assert_eq!(updated.email, member.email);
    assert_eq!(updated.status, MemberStatus::Active);
}

#[test]
fn file_backend_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let created = {
        let storage = FileStorage::open(dir.path()).unwrap();
        let members = PersistedCollection::<_, Member>::open(storage);
        members.add(draft("Old")).unwrap();
        members.add(draft("New")).unwrap()
    };

    let storage = FileStorage::open(dir.path()).unwrap();
    let members = PersistedCollection::<_, Member>::open(storage.clone());
    assert_eq!(members.len(), 2);
    assert_eq!(members.list()[0], created);
    assert!(storage.load_json::<Vec<Member>>(Member::SLOT).is_some());
}

#[test]
fn corrupt_file_slot_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("members.json"), "not json at all").unwrap();

    let members = PersistedCollection::<_, Member>::open(FileStorage::open(dir.path()).unwrap());
    assert!(members.is_empty());
}

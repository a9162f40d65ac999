use minion_engine::{
    FileStorage, MemoryStorage, Minion, Persisted, Roster, Storage, StoreError, Tracker,
};
use tempfile::TempDir;

const GOBLIN: &str = r#"[{"id":"00000000-0000-4000-8000-000000000001","name":"Goblin","hp":7,"maxHp":7,"ac":13,"attack":4,"damage":"1d6+2","notes":"Sneaky","active":true}]"#;

fn goblin() -> Minion {
    Minion {
        id: "00000000-0000-4000-8000-000000000001".parse().unwrap(),
        name: "Goblin".into(),
        hp: 7,
        max_hp: 7,
        ac: 13,
        attack: 4,
        damage: "1d6+2".into(),
        notes: "Sneaky".into(),
        active: true,
    }
}

#[test]
fn persisted_shape_is_stable() {
    let roster = Roster::from(vec![goblin()]);
    insta::assert_snapshot!(
        minion_engine::to_json(&roster, false).unwrap(),
        @r#"[{"id":"00000000-0000-4000-8000-000000000001","name":"Goblin","hp":7,"maxHp":7,"ac":13,"attack":4,"damage":"1d6+2","notes":"Sneaky","active":true}]"#
    );
}

#[test]
fn file_storage_round_trip() {
    let dir = TempDir::new().unwrap();
    let mut store = FileStorage::new(dir.path().join("nested"));
    assert_eq!(store.get("minions").unwrap(), None);
    store.set("minions", GOBLIN).unwrap();
    assert_eq!(store.get("minions").unwrap().as_deref(), Some(GOBLIN));
    assert!(store.path_for("minions").exists());
    store.remove("minions").unwrap();
    assert_eq!(store.get("minions").unwrap(), None);
    // Removing twice is fine.
    store.remove("minions").unwrap();
}

#[test]
fn file_storage_leaves_no_temp_file() {
    let dir = TempDir::new().unwrap();
    let mut store = FileStorage::new(dir.path());
    store.set("minions", "[]").unwrap();
    let names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, ["minions.json"]);
}

#[test]
fn tracker_hydrates_from_storage() {
    let store = MemoryStorage::new().with_record("minions", GOBLIN);
    let t = Tracker::open(store, "minions");
    assert_eq!(t.roster(), &Roster::from(vec![goblin()]));
}

#[test]
fn roster_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let id = {
        let mut t = Tracker::open(FileStorage::new(dir.path()), "minions");
        let id = t.spawn(minion_engine::SpawnData {
            name: "Skeleton".into(),
            hp: 13,
            ac: 13,
            attack: 4,
            damage: "1d6+2".into(),
            notes: "Vulnerable to bludgeoning".into(),
        });
        t.damage(id, 5);
        id
    };
    let t = Tracker::open(FileStorage::new(dir.path()), "minions");
    let m = t.find(id).unwrap();
    assert_eq!((m.hp, m.max_hp), (8, 13));
    assert_eq!(m.notes, "Vulnerable to bludgeoning");
}

#[test]
fn malformed_record_loads_empty() {
    for bad in ["{oops", "42", r#"{"name":"Goblin"}"#, r#"[{"name":"Goblin"}]"#] {
        let store = MemoryStorage::new().with_record("minions", bad);
        let t = Tracker::open(store, "minions");
        assert!(t.roster().is_empty(), "{bad} should load as empty");
    }
}

#[test]
fn missing_optional_fields_default() {
    let old = r#"[{"id":"00000000-0000-4000-8000-000000000001","name":"Goblin","hp":7,"maxHp":7,"ac":13,"attack":4,"extra":1}]"#;
    let t = Tracker::open(MemoryStorage::new().with_record("minions", old), "minions");
    let m = &t.roster().as_slice()[0];
    assert_eq!(m.damage, "");
    assert_eq!(m.notes, "");
    assert!(m.active);
}

#[test]
fn write_failure_is_not_fatal() {
    let mut store = MemoryStorage::new();
    store.set_fail_writes(true);
    let mut t = Tracker::open(store, "minions");
    let id = t.spawn(minion_engine::SpawnData {
        name: "Kobold".into(),
        hp: 5,
        ac: 12,
        attack: 4,
        damage: "1d4+2".into(),
        notes: String::new(),
    });
    t.damage(id, 2);
    assert_eq!(t.find(id).unwrap().hp, 3);
    assert_eq!(t.storage().get("minions").unwrap(), None);
    assert!(matches!(t.flush(), Err(StoreError::QuotaExceeded { .. })));

    t.storage_mut().set_fail_writes(false);
    t.flush().unwrap();
    let reopened = Tracker::open(t.storage().clone(), "minions");
    assert_eq!(reopened.roster(), t.roster());
}

#[test]
fn persisted_adapter_with_structs() {
    let mut p = Persisted::load(MemoryStorage::new(), "test-key", vec![goblin()]);
    assert_eq!(p.value().len(), 1);
    let mut orc = goblin();
    orc.name = "Orc".into();
    orc.hp = 15;
    p.set(vec![orc.clone()]);
    let text = p.storage().get("test-key").unwrap().unwrap();
    let back: Vec<Minion> = serde_json::from_str(&text).unwrap();
    assert_eq!(back, vec![orc]);
}

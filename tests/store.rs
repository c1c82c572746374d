use std::{ fs, path::PathBuf };
use ndarray::Array3;
use num_complex::Complex64 as C64;
use maxwell_bloch::{
    CacheRecord,
    Error,
    MbSolve,
    ObSolve,
    ResultsStore,
    Step,
    TimeFunc,
    store::ob_config_identity,
};

const TWO_LEVEL: &str = r#"
    label = "store"
    t_min = 0.0
    t_max = 1.0
    t_steps = 40
    z_steps = 4
    interaction_strengths = [0.3]

    [atom]
    num_states = 2

    [[atom.decays]]
    rate = 0.5
    channels = [[0, 1]]

    [[atom.fields]]
    coupled_levels = [[0, 1]]
    rabi_freq = 0.5
"#;

// unique per test so that tests can run in parallel
fn store_dir(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("maxwell-bloch-test-{}-{}", name, std::process::id()))
}

#[test]
fn save_load_roundtrip_is_exact() {
    let dir = store_dir("roundtrip");
    let store = ResultsStore::new(&dir).unwrap();
    let mut mb = MbSolve::from_toml_str(TWO_LEVEL).unwrap();
    let (omegas, states) = mb.mbsolve(Step::AdamsBashforth, true, Some(&store)).unwrap();
    let identity = mb.identity(Step::AdamsBashforth).unwrap();
    assert!(store.contains(&identity));

    let record = store.load(&identity).unwrap().unwrap();
    assert_eq!(record.identity, identity);
    assert_eq!(record.omegas_zt, omegas);
    assert_eq!(record.states_zt, states);

    assert!(store.remove(&identity).unwrap());
    assert!(store.load(&identity).unwrap().is_none());
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn stored_results_are_used_without_recalc() {
    let dir = store_dir("no-recalc");
    let store = ResultsStore::new(&dir).unwrap();
    let mut mb = MbSolve::from_toml_str(TWO_LEVEL).unwrap();
    let identity = mb.identity(Step::Euler).unwrap();

    // a record that no solve could have produced
    let marker = C64::new(123.0, -4.5);
    let record = CacheRecord {
        identity: identity.clone(),
        omegas_zt: Array3::from_elem(mb.omegas_zt().dim(), marker),
        states_zt: Array3::from_elem(mb.states_zt().dim(), marker),
    };
    store.save(&record).unwrap();

    let (omegas, states) = mb.mbsolve(Step::Euler, false, Some(&store)).unwrap();
    assert!(mb.loaded_from_store());
    assert_eq!(omegas, record.omegas_zt);
    assert_eq!(states, record.states_zt);
    assert_eq!(mb.omegas_zt(), &record.omegas_zt);

    // recalc ignores and then replaces the record
    let (omegas, _) = mb.mbsolve(Step::Euler, true, Some(&store)).unwrap();
    assert!(!mb.loaded_from_store());
    assert_ne!(omegas, record.omegas_zt);
    assert_eq!(store.load(&identity).unwrap().unwrap().omegas_zt, omegas);

    // the other step scheme has its own record
    mb.mbsolve(Step::AdamsBashforth, false, Some(&store)).unwrap();
    assert!(!mb.loaded_from_store());
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn cache_miss_falls_through_to_a_solve() {
    let dir = store_dir("miss");
    let store = ResultsStore::new(&dir).unwrap();
    let mut mb = MbSolve::from_toml_str(TWO_LEVEL).unwrap();
    let identity = mb.identity(Step::AdamsBashforth).unwrap();
    assert!(!store.contains(&identity));

    let (omegas, _) = mb.mbsolve(Step::AdamsBashforth, false, Some(&store)).unwrap();
    assert!(!mb.loaded_from_store());
    assert!(store.contains(&identity));

    // a fresh solver with the same configuration now hits the store
    let mut again = MbSolve::from_toml_str(TWO_LEVEL).unwrap();
    let (loaded, _) = again.mbsolve(Step::AdamsBashforth, false, Some(&store)).unwrap();
    assert!(again.loaded_from_store());
    assert_eq!(loaded, omegas);
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn mismatched_records_are_store_errors() {
    let dir = store_dir("mismatch");
    let store = ResultsStore::new(&dir).unwrap();
    let mut mb = MbSolve::from_toml_str(TWO_LEVEL).unwrap();
    let identity = mb.identity(Step::Euler).unwrap();

    // a record filed under the wrong identity
    let other = CacheRecord {
        identity: "not-this-one".to_string(),
        omegas_zt: Array3::zeros(mb.omegas_zt().dim()),
        states_zt: Array3::zeros(mb.states_zt().dim()),
    };
    let path = store.save(&other).unwrap();
    fs::rename(&path, store.path_for(&identity)).unwrap();
    assert!(matches!(store.load(&identity), Err(Error::Store(_))));
    assert!(matches!(mb.mbsolve(Step::Euler, false, Some(&store)), Err(Error::Store(_))));

    // a record with the right identity but the wrong grid
    let wrong_grid = CacheRecord {
        identity: identity.clone(),
        omegas_zt: Array3::zeros((1, 2, 3)),
        states_zt: Array3::zeros((4, 2, 3)),
    };
    store.save(&wrong_grid).unwrap();
    assert!(matches!(mb.mbsolve(Step::Euler, false, Some(&store)), Err(Error::Store(_))));

    // an unreadable file
    fs::write(store.path_for(&identity), b"not an archive").unwrap();
    assert!(matches!(store.load(&identity), Err(Error::Store(_))));
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn identity_tracks_configuration() {
    let mut a = MbSolve::from_toml_str(TWO_LEVEL).unwrap();
    let b = MbSolve::from_toml_str(TWO_LEVEL).unwrap();
    assert_eq!(a.identity(Step::Euler).unwrap(), b.identity(Step::Euler).unwrap());
    assert_ne!(
        a.identity(Step::Euler).unwrap(),
        a.identity(Step::AdamsBashforth).unwrap(),
    );
    let before = a.identity(Step::Euler).unwrap();
    a.build_velocity_classes(maxwell_bloch::VelocityClassesConfig {
        thermal_delta_min: Some(-1.0),
        thermal_delta_max: Some(1.0),
        thermal_delta_steps: Some(4),
        thermal_width: Some(1.0),
        ..Default::default()
    }).unwrap();
    assert_ne!(before, a.identity(Step::Euler).unwrap());
}

const DRIVEN_TWO_LEVEL: &str = r#"
    t_min = 0.0
    t_max = 1.0
    t_steps = 40

    [atom]
    num_states = 2

    [[atom.decays]]
    rate = 0.5
    channels = [[0, 1]]

    [[atom.fields]]
    coupled_levels = [[0, 1]]
    rabi_freq = 0.5
"#;

#[test]
fn single_point_solve_miss_then_hit() {
    let dir = store_dir("ob-hit");
    let store = ResultsStore::new(&dir).unwrap();
    let mut ob = ObSolve::from_toml_str(DRIVEN_TWO_LEVEL).unwrap();
    let identity = ob.identity().unwrap();
    assert!(!store.contains(&identity));

    let computed = ob.solve(false, Some(&store)).unwrap().clone();
    assert!(!ob.loaded_from_store());
    assert!(store.contains(&identity));
    let record = store.load(&identity).unwrap().unwrap();
    assert_eq!(record.states_zt.shape(), &[4, 1, 41]);
    assert_eq!(record.omegas_zt.shape(), &[1, 1, 41]);

    let mut again = ObSolve::from_toml_str(DRIVEN_TWO_LEVEL).unwrap();
    let loaded = again.solve(false, Some(&store)).unwrap().clone();
    assert!(again.loaded_from_store());
    assert_eq!(loaded, computed);
    assert_eq!(again.populations(&[1]).unwrap(), ob.populations(&[1]).unwrap());
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn single_point_solve_uses_record_without_recalc() {
    let dir = store_dir("ob-recalc");
    let store = ResultsStore::new(&dir).unwrap();
    let mut ob = ObSolve::from_toml_str(DRIVEN_TWO_LEVEL).unwrap();
    let identity = ob.identity().unwrap();

    let marker = C64::new(7.0, 0.25);
    let record = CacheRecord {
        identity: identity.clone(),
        omegas_zt: Array3::zeros((1, 1, 41)),
        states_zt: Array3::from_elem((4, 1, 41), marker),
    };
    store.save(&record).unwrap();
    let states = ob.solve(false, Some(&store)).unwrap();
    assert!(states.iter().all(|&x| x == marker));
    assert!(ob.loaded_from_store());

    // recalc ignores and then replaces the record
    let states = ob.solve(true, Some(&store)).unwrap().clone();
    assert!(!ob.loaded_from_store());
    assert!(states.iter().all(|&x| x != marker));
    let replaced = store.load(&identity).unwrap().unwrap();
    assert_eq!(replaced.states_zt.into_shape((2, 2, 41)).unwrap(), states);

    // a record for another grid is rejected
    let wrong = CacheRecord {
        identity: identity.clone(),
        omegas_zt: Array3::zeros((1, 1, 5)),
        states_zt: Array3::zeros((4, 1, 5)),
    };
    store.save(&wrong).unwrap();
    assert!(matches!(ob.solve(false, Some(&store)), Err(Error::Store(_))));
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn single_point_identity_tracks_envelope() {
    let mut ob = ObSolve::from_toml_str(DRIVEN_TWO_LEVEL).unwrap();
    let before = ob.identity().unwrap();
    assert_eq!(before, ob_config_identity(ob.config()).unwrap());
    ob.set_field_t_func(0, 0.5, TimeFunc::gaussian_n_pi(0.5, 0.2, 1.0)).unwrap();
    assert_ne!(before, ob.identity().unwrap());
    assert_eq!(ob.config().atom.fields[0].rabi_freq_t_func.as_deref(), Some("gaussian"));
}

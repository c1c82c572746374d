use std::f64::consts::PI;
use approx::assert_abs_diff_eq;
use ndarray::{ s, Array1 };
use num_complex::Complex64 as C64;
use maxwell_bloch::{
    Error,
    MbSolve,
    MbSolveConfig,
    Step,
    TimeFunc,
};

const TWO_LEVEL_SQUARE: &str = r#"
    label = "two-level square"
    t_min = 0.0
    t_max = 1.0
    t_steps = 50
    z_min = 0.0
    z_max = 1.0
    z_steps = 5
    interaction_strengths = [0.0]

    [atom]
    num_states = 2

    [[atom.decays]]
    rate = 1.0
    channels = [[0, 1]]

    [[atom.fields]]
    label = "signal"
    coupled_levels = [[0, 1]]
    rabi_freq = 0.5

    [atom.fields.rabi_freq_t_args]
    on = 0.2
    off = 0.8
    ampl = 1.0
"#;

fn soliton(t_func: &str, width_arg: &str, t_min: f64, t_max: f64) -> MbSolveConfig {
    MbSolveConfig::from_toml_str(&format!(r#"
        label = "two-level {t_func} 2pi"
        t_min = {t_min:.1}
        t_max = {t_max:.1}
        t_steps = 240
        z_min = 0.0
        z_max = 1.0
        z_steps = 20
        interaction_strengths = [1.0]

        [atom]
        num_states = 2

        [[atom.fields]]
        coupled_levels = [[0, 1]]
        rabi_freq = 1.0
        rabi_freq_t_func = "{t_func}"

        [atom.fields.rabi_freq_t_args]
        n_pi = 2.0
        centre = 0.0
        {width_arg} = 1.0
    "#)).unwrap()
}

#[test]
fn zlist_is_exact() {
    let mut cfg = MbSolveConfig::default();
    cfg.z_min = 0.0;
    cfg.z_max = 1.0;
    cfg.z_steps = 10;
    let mb = MbSolve::new(cfg).unwrap();
    let expected = [0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];
    assert_eq!(mb.zlist().to_vec(), expected.to_vec());
    assert_abs_diff_eq!(mb.z_step(), 0.1, epsilon = 1e-15);
    assert_eq!(mb.tlist().len(), 101);
}

#[test]
fn queries_before_solve_are_zero() {
    let mb = MbSolve::from_toml_str(TWO_LEVEL_SQUARE).unwrap();
    let (nz, nt) = (mb.zlist().len(), mb.tlist().len());
    for pops in [
        mb.populations(&[0]).unwrap(),
        mb.populations_field(0, true).unwrap(),
        mb.populations_field(0, false).unwrap(),
        mb.coherences(&[(0, 1)]).unwrap(),
        mb.coherences_field(0).unwrap(),
    ] {
        assert_eq!(pops.shape(), &[nz, nt]);
        assert!(pops.iter().all(|&p| p == 0.0));
    }
    assert!(matches!(mb.populations_field(1, true), Err(Error::OutOfRange { .. })));
    assert!(matches!(mb.coherences(&[(0, 2)]), Err(Error::OutOfRange { .. })));
    assert!(matches!(mb.omegas_intp_t_funcs(nz), Err(Error::OutOfRange { .. })));
}

#[test]
fn input_field_is_set_at_construction() {
    let mb = MbSolve::from_toml_str(TWO_LEVEL_SQUARE).unwrap();
    let om = mb.omegas_zt();
    assert_eq!(om.shape(), &[1, 6, 51]);
    assert_eq!(mb.states_zt().shape(), &[4, 6, 51]);
    // square on [0.2, 0.8] at 2π * 0.5
    assert_eq!(om[[0, 0, 5]].re, 0.0);
    assert_abs_diff_eq!(om[[0, 0, 25]].re, PI, epsilon = 1e-15);
    assert!(om.slice(s![.., 1.., ..]).iter().all(|w| w.norm() == 0.0));
}

#[test]
fn zero_coupling_leaves_field_unchanged() {
    for step in [Step::Euler, Step::AdamsBashforth] {
        let mut mb = MbSolve::from_toml_str(TWO_LEVEL_SQUARE).unwrap();
        let (om, st) = mb.mbsolve(step, true, None).unwrap();
        let first = om.slice(s![.., 0, ..]);
        for k in 0..mb.zlist().len() {
            assert_eq!(om.slice(s![.., k, ..]), first);
        }
        // every slice sees the same field, so the atoms agree too
        let last = mb.zlist().len() - 1;
        assert_eq!(st.slice(s![.., 0, ..]), st.slice(s![.., last, ..]));
        assert!(!mb.loaded_from_store());
        assert_eq!(&om, mb.omegas_zt());
    }
}

#[test]
fn missing_interaction_strengths_default_to_zero() {
    let mut cfg = MbSolveConfig::from_toml_str(TWO_LEVEL_SQUARE).unwrap();
    cfg.interaction_strengths.clear();
    let mb = MbSolve::new(cfg.clone()).unwrap();
    assert_eq!(mb.interaction_strengths(), &[0.0]);

    cfg.interaction_strengths = vec![1.0, 2.0];
    assert!(matches!(MbSolve::new(cfg), Err(Error::Config(_))));
}

#[test]
fn degenerate_grids_fail_at_construction() {
    let mut cfg = MbSolveConfig::from_toml_str(TWO_LEVEL_SQUARE).unwrap();
    cfg.t_min = 1.0;
    cfg.t_max = 1.0;
    cfg.t_steps = 10;
    assert!(matches!(MbSolve::new(cfg), Err(Error::Config(_))));

    let mut cfg = MbSolveConfig::from_toml_str(TWO_LEVEL_SQUARE).unwrap();
    cfg.z_max = cfg.z_min;
    assert!(matches!(MbSolve::new(cfg), Err(Error::Config(_))));
}

#[test]
fn empty_thermal_spec_matches_direct_solve() {
    let mut mb = MbSolve::from_toml_str(TWO_LEVEL_SQUARE).unwrap();
    let mut cfg = mb.config().clone();
    cfg.interaction_strengths = vec![0.5];
    let mut mb_coupled = MbSolve::new(cfg).unwrap();
    for mb in [&mut mb, &mut mb_coupled] {
        assert_eq!(mb.velocity_classes().len(), 1);
        let direct = mb.solve_velocity_class(Step::AdamsBashforth, 0.0).unwrap();
        let averaged = mb.mbsolve(Step::AdamsBashforth, true, None).unwrap();
        assert_eq!(direct, averaged);
    }
}

#[test]
fn coupled_medium_absorbs_a_weak_pulse() {
    let mut cfg = MbSolveConfig::from_toml_str(TWO_LEVEL_SQUARE).unwrap();
    cfg.interaction_strengths = vec![0.2];
    let mut mb = MbSolve::new(cfg).unwrap();
    mb.mbsolve(Step::Euler, true, None).unwrap();
    let area = mb.fields_area();
    assert_eq!(area.shape(), &[1, 6]);
    for k in 1..6 {
        assert!(area[[0, k]] < area[[0, k - 1]]);
    }
    // populations stay normalized at every point
    let total = mb.populations(&[0, 1]).unwrap();
    assert!(total.iter().all(|&p| (p - 1.0).abs() < 1e-9));
}

#[test]
fn gaussian_2pi_soliton_keeps_its_area() {
    let mut mb = MbSolve::new(soliton("gaussian", "fwhm", -2.0, 10.0)).unwrap();
    mb.mbsolve(Step::AdamsBashforth, true, None).unwrap();
    let area = mb.fields_area();
    let last = mb.zlist().len() - 1;
    assert_abs_diff_eq!(area[[0, 0]] / PI, 2.0, epsilon = 0.05);
    assert_abs_diff_eq!(area[[0, last]] / PI, 2.0, epsilon = 0.05);
}

#[test]
fn sech_2pi_soliton_keeps_its_area() {
    let mut mb = MbSolve::new(soliton("sech", "fwhm", -3.0, 9.0)).unwrap();
    mb.mbsolve(Step::AdamsBashforth, true, None).unwrap();
    let area = mb.fields_area();
    let last = mb.zlist().len() - 1;
    assert_abs_diff_eq!(area[[0, 0]] / PI, 2.0, epsilon = 0.05);
    assert_abs_diff_eq!(area[[0, last]] / PI, 2.0, epsilon = 0.05);
}

#[test]
fn interpolated_output_chains_into_a_new_solve() {
    let mut cfg = MbSolveConfig::from_toml_str(TWO_LEVEL_SQUARE).unwrap();
    cfg.interaction_strengths = vec![1.0];
    let mut first = MbSolve::new(cfg.clone()).unwrap();
    first.mbsolve(Step::AdamsBashforth, true, None).unwrap();
    let last = first.zlist().len() - 1;
    let funcs = first.omegas_intp_t_funcs(last).unwrap();
    assert_eq!(funcs.len(), 1);
    assert_eq!(funcs[0].name(), "intp");

    let mut second = MbSolve::new(cfg).unwrap();
    let identity = second.identity(Step::AdamsBashforth).unwrap();
    second.set_field_t_func(0, 1.0, funcs[0].clone()).unwrap();
    assert_ne!(identity, second.identity(Step::AdamsBashforth).unwrap());
    let input = second.omegas_zt().slice(s![0, 0, ..]).to_owned();
    let output = first.omegas_zt().slice(s![0, last, ..]).to_owned();
    input.iter().zip(output.iter())
        .for_each(|(a, b)| assert_abs_diff_eq!((a - b).norm(), 0.0, epsilon = 1e-12));

    // the new envelope survives a round trip through the configuration
    let reparsed = MbSolveConfig::from_toml_str(
        &second.config().to_toml_string().unwrap()).unwrap();
    let rebuilt = MbSolve::new(reparsed).unwrap();
    assert_eq!(rebuilt.omegas_zt(), second.omegas_zt());

    assert!(matches!(
        second.set_field_t_func(3, 1.0, TimeFunc::default()),
        Err(Error::OutOfRange { .. }),
    ));
}

#[test]
fn step_names() {
    assert_eq!("euler".parse::<Step>().unwrap(), Step::Euler);
    assert_eq!("ab".parse::<Step>().unwrap(), Step::AdamsBashforth);
    assert!(matches!("rk4".parse::<Step>(), Err(Error::Config(_))));
}

fn weak_absorber(z_steps: usize) -> MbSolveConfig {
    MbSolveConfig::from_toml_str(&format!(r#"
        label = "weak absorber"
        t_min = -2.0
        t_max = 6.0
        t_steps = 400
        z_min = 0.0
        z_max = 1.0
        z_steps = {z_steps}
        interaction_strengths = [0.5]

        [atom]
        num_states = 2

        [[atom.decays]]
        rate = 1.0
        channels = [[0, 1]]

        [[atom.fields]]
        coupled_levels = [[0, 1]]
        rabi_freq = 1.0
        rabi_freq_t_func = "gaussian"

        [atom.fields.rabi_freq_t_args]
        n_pi = 1.0e-3
        centre = 0.0
        fwhm = 0.5
    "#)).unwrap()
}

// output field at z_max
fn transmitted(step: Step, z_steps: usize) -> Array1<C64> {
    let mut mb = MbSolve::new(weak_absorber(z_steps)).unwrap();
    let (om, _) = mb.mbsolve(step, true, None).unwrap();
    om.slice(s![0, z_steps, ..]).to_owned()
}

#[test]
fn spatial_steps_converge_at_their_order() {
    let reference = transmitted(Step::AdamsBashforth, 128);
    let error = |step: Step, z_steps: usize| -> f64 {
        transmitted(step, z_steps).iter().zip(reference.iter())
            .map(|(a, b)| (a - b).norm())
            .fold(0.0, f64::max)
    };
    let (euler_8, euler_16) = (error(Step::Euler, 8), error(Step::Euler, 16));
    let (ab_8, ab_16) = (error(Step::AdamsBashforth, 8), error(Step::AdamsBashforth, 16));

    // the medium does change the field
    let input
        = MbSolve::new(weak_absorber(1)).unwrap()
        .omegas_zt().slice(s![0, 0, ..]).to_owned();
    let change
        = input.iter().zip(reference.iter())
        .map(|(a, b)| (a - b).norm())
        .fold(0.0, f64::max);
    assert!(change > 10.0 * euler_8);

    assert!(ab_8 < euler_8);
    let euler_ratio = euler_8 / euler_16;
    let ab_ratio = ab_8 / ab_16;
    assert!((1.6..2.4).contains(&euler_ratio), "euler ratio {}", euler_ratio);
    assert!((3.0..5.0).contains(&ab_ratio), "adams-bashforth ratio {}", ab_ratio);
}

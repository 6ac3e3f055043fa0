use approx::assert_relative_eq;
use fractal_ising::{IsingModel, ScalingMethod};

fn brute_force(model: &IsingModel) -> f64 {
    let n = model.num_spins().unwrap();
    let active: Vec<usize> = model
        .spin_array()
        .unwrap()
        .iter()
        .enumerate()
        .filter(|(_, &s)| s != 0)
        .map(|(i, _)| i)
        .collect();

    (0u64..1 << active.len())
        .map(|mask| {
            let flips: Vec<usize> = active
                .iter()
                .enumerate()
                .filter(|(bit, _)| mask >> bit & 1 == 1)
                .map(|(_, &i)| i)
                .collect();
            assert!(flips.iter().all(|&i| i < n));
            model.effective_hamiltonian(&flips).unwrap().exp()
        })
        .sum()
}

#[test]
fn enumerator_matches_brute_force_on_a_chain() {
    let mut model = IsingModel::default();
    model.set_hausdorff_dimension(1.0);
    model.set_lattice_depth(2);
    model.set_coupling_consts(0.3, 0.7);
    model.set_temperature(1.5);
    model.set_num_threads(3);
    model.setup().unwrap();

    assert_eq!(model.num_spins().unwrap(), 8);
    assert_relative_eq!(
        model.partition_function().unwrap(),
        brute_force(&model),
        max_relative = 1e-10
    );
}

#[test]
fn enumerator_matches_brute_force_on_a_cantor_like_set() {
    let mut model = IsingModel::default();
    model.set_hausdorff_method(ScalingMethod::Splitting);
    model.set_hausdorff_dimension(0.63);
    model.set_hausdorff_scale(1.0 / 3.0);
    model.set_lattice_depth(2);
    model.set_interaction_sigma(2.0);
    model.set_coupling_consts(-0.4, 1.0);
    model.set_num_threads(2);
    model.setup().unwrap();

    model.set_spin_active(1, false).unwrap();
    model.set_all_spins(-1).unwrap();

    assert_eq!(model.num_active_spins().unwrap(), model.num_spins().unwrap() - 1);
    assert_relative_eq!(
        model.partition_function().unwrap(),
        brute_force(&model),
        max_relative = 1e-10
    );
}

#[test]
fn spin_state_does_not_change_the_sum() {
    let mut model = IsingModel::default();
    model.set_hausdorff_dimension(1.0);
    model.set_lattice_depth(2);
    model.set_seed(Some(4));
    model.setup().unwrap();

    let before = model.partition_function().unwrap();
    model.randomize_spins().unwrap();
    assert_relative_eq!(model.partition_function().unwrap(), before, max_relative = 1e-10);
}

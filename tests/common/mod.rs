// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Functions used in various integration tests.

use std::path::Path;

use groan_rs::prelude::{System, Vector3D};
use grmsf::prelude::{AtomInfo, Topology};
use nalgebra::{Rotation3, Vector3};

/// Six C-alpha atoms of a short, non-planar peptide backbone (in nm).
#[allow(dead_code)]
pub(super) fn backbone() -> Vec<Vector3<f64>> {
    vec![
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(0.38, 0.0, 0.0),
        Vector3::new(0.5, 0.36, 0.0),
        Vector3::new(0.42, 0.6, 0.3),
        Vector3::new(0.1, 0.7, 0.5),
        Vector3::new(-0.2, 0.5, 0.3),
    ]
}

/// One C-alpha atom per residue, residues numbered from 1.
#[allow(dead_code)]
pub(super) fn calpha_topology(n_atoms: usize) -> Topology {
    Topology::new(
        (0..n_atoms)
            .map(|i| AtomInfo::new("CA", "ALA", i + 1))
            .collect(),
    )
}

#[allow(dead_code)]
pub(super) fn apply_rigid_motion(
    positions: &[Vector3<f64>],
    rotation: &Rotation3<f64>,
    shift: &Vector3<f64>,
) -> Vec<Vector3<f64>> {
    positions.iter().map(|p| rotation * p + shift).collect()
}

/// Sum of squared fluctuations over all atoms.
#[allow(dead_code)]
pub(super) fn total_squared(values: &[f64]) -> f64 {
    values.iter().map(|x| x * x).sum()
}

/// Name of the atom with the given index in the peptide.
fn peptide_atom_name(index: usize) -> &'static str {
    if index % 2 == 0 {
        "N"
    } else {
        "CA"
    }
}

/// Topology of the peptide: atoms N and CA in each of six alanine residues.
#[allow(dead_code)]
pub(super) fn peptide_topology() -> Topology {
    Topology::new(
        (0..12)
            .map(|i| AtomInfo::new(peptide_atom_name(i), "ALA", i / 2 + 1))
            .collect(),
    )
}

/// Frames of the peptide with small internal motions, a flexible last residue
/// and a different rigid motion in every frame.
#[allow(dead_code)]
pub(super) fn peptide_frames(n_frames: usize) -> Vec<Vec<Vector3<f64>>> {
    (0..n_frames)
        .map(|i| {
            let positions = backbone()
                .iter()
                .enumerate()
                .flat_map(|(j, p)| {
                    let mut ca = p
                        + 0.02 * (1.3 * i as f64 + j as f64).sin() * Vector3::new(1.0, 0.5, -0.7);
                    if j == 5 {
                        ca += Vector3::new(0.15 * (i % 2) as f64, -0.05 * (i % 3) as f64, 0.0);
                    }

                    [ca + Vector3::new(0.1, 0.05, -0.08), ca]
                })
                .collect::<Vec<_>>();

            apply_rigid_motion(
                &positions,
                &Rotation3::from_euler_angles(0.2 * i as f64, -0.1 * i as f64, 0.15 * i as f64),
                &Vector3::new(2.5 + 0.05 * i as f64, 2.5, 2.5),
            )
        })
        .collect()
}

/// Write the first frame of the peptide into a gro file and all frames into an xtc file.
/// Frame `i` is written with simulation time `10 * i` ps. Returns paths to both files.
#[allow(dead_code)]
pub(super) fn write_peptide(directory: &Path, frames: &[Vec<Vector3<f64>>]) -> (String, String) {
    let gro = directory.join("peptide.gro");
    let mut content = String::from("Short peptide\n   12\n");
    for (i, p) in frames[0].iter().enumerate() {
        content.push_str(&format!(
            "{:>5}{:<5}{:>5}{:>5}{:>8.3}{:>8.3}{:>8.3}\n",
            i / 2 + 1,
            "ALA",
            peptide_atom_name(i),
            i + 1,
            p.x,
            p.y,
            p.z
        ));
    }
    content.push_str("   5.00000   5.00000   5.00000\n");
    std::fs::write(&gro, content).unwrap();

    let xtc = directory.join("peptide.xtc");
    let mut system = System::from_file(&gro).unwrap();
    system.set_precision(1000);
    system.traj_writer_auto_init(&xtc).unwrap();

    for (i, frame) in frames.iter().enumerate() {
        for (atom, p) in system.atoms_iter_mut().zip(frame.iter()) {
            atom.set_position(Vector3D::new(p.x as f32, p.y as f32, p.z as f32));
        }

        system.set_simulation_time(10.0 * i as f32);
        system.set_simulation_step(5000 * i as u64);
        system.traj_write_frame().unwrap();
    }

    system.traj_close();

    (
        gro.to_str().unwrap().to_owned(),
        xtc.to_str().unwrap().to_owned(),
    )
}

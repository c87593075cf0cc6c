use nalgebra::{DMatrix, Point3};
use thiserror::Error;

/// Source of per-frame atomic coordinates for one topology.
///
/// Implementors must use the same atom indexing as the topology they accompany.
pub trait CoordinateProvider {
    fn frame_count(&self) -> usize;

    fn atom_count(&self) -> usize;

    fn position(&self, frame: usize, atom: usize) -> Option<&Point3<f64>>;

    /// Euclidean distances for every atom pair in every frame.
    ///
    /// The returned matrix has one row per frame and one column per entry of `atom_pairs`.
    /// Pairs referencing atoms outside `[0, atom_count)` yield `f64::NAN`, which never
    /// satisfies a distance cutoff.
    fn distances(&self, atom_pairs: &[(usize, usize)]) -> DMatrix<f64> {
        DMatrix::from_fn(self.frame_count(), atom_pairs.len(), |frame, col| {
            let (a, b) = atom_pairs[col];
            match (self.position(frame, a), self.position(frame, b)) {
                (Some(pa), Some(pb)) => nalgebra::distance(pa, pb),
                _ => f64::NAN,
            }
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrajectoryError {
    #[error("Frame {frame} has {found} atoms, expected {expected}")]
    AtomCountMismatch {
        frame: usize,
        expected: usize,
        found: usize,
    },
}

/// In-memory trajectory: one coordinate vector per frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    atom_count: usize,
    frames: Vec<Vec<Point3<f64>>>,
}

impl Trajectory {
    pub fn new(atom_count: usize) -> Self {
        Self {
            atom_count,
            frames: Vec::new(),
        }
    }

    pub fn from_frames(
        atom_count: usize,
        frames: Vec<Vec<Point3<f64>>>,
    ) -> Result<Self, TrajectoryError> {
        let mut trajectory = Self::new(atom_count);
        for frame in frames {
            trajectory.push_frame(frame)?;
        }
        Ok(trajectory)
    }

    pub fn push_frame(&mut self, positions: Vec<Point3<f64>>) -> Result<(), TrajectoryError> {
        if positions.len() != self.atom_count {
            return Err(TrajectoryError::AtomCountMismatch {
                frame: self.frames.len(),
                expected: self.atom_count,
                found: positions.len(),
            });
        }
        self.frames.push(positions);
        Ok(())
    }

    pub fn frame(&self, index: usize) -> Option<&[Point3<f64>]> {
        self.frames.get(index).map(Vec::as_slice)
    }

    /// Builds a trajectory restricted to the given atoms, in the given order.
    ///
    /// Indices outside the trajectory are skipped.
    pub fn slice_atoms(&self, atom_indices: &[usize]) -> Trajectory {
        let kept: Vec<usize> = atom_indices
            .iter()
            .copied()
            .filter(|&idx| idx < self.atom_count)
            .collect();
        let frames = self
            .frames
            .iter()
            .map(|frame| kept.iter().map(|&idx| frame[idx]).collect())
            .collect();
        Trajectory {
            atom_count: kept.len(),
            frames,
        }
    }
}

impl CoordinateProvider for Trajectory {
    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn atom_count(&self) -> usize {
        self.atom_count
    }

    fn position(&self, frame: usize, atom: usize) -> Option<&Point3<f64>> {
        self.frames.get(frame)?.get(atom)
    }
}

/// Volume assigned to a compartment declared without explicit voxels, in cubic metres.
pub const DEFAULT_VOXEL_VOLUME: f64 = 1e-18;

/// A spatial region in which pools and reactions are defined.
///
/// A compartment is discretised into one or more voxels, each with its own volume.
/// Volumes are in cubic metres; together with concentrations in millimolar they yield
/// molecule counts through Avogadro's number.
#[derive(Debug, Clone, PartialEq)]
pub struct Compartment {
    pub name: String,
    voxel_volumes: Vec<f64>,
}

impl Compartment {
    pub fn new(name: &str, voxel_volumes: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            voxel_volumes,
        }
    }

    pub fn voxel_volumes(&self) -> &[f64] {
        &self.voxel_volumes
    }

    /// Number of voxels; a compartment without declared voxels is one voxel.
    pub fn num_voxels(&self) -> usize {
        self.voxel_volumes.len().max(1)
    }

    /// Volume of the given voxel.
    ///
    /// Falls back to the first voxel when `voxel` is out of range, and to
    /// [`DEFAULT_VOXEL_VOLUME`] when the compartment declares no voxels.
    pub fn volume(&self, voxel: usize) -> f64 {
        self.voxel_volumes
            .get(voxel)
            .or_else(|| self.voxel_volumes.first())
            .copied()
            .unwrap_or(DEFAULT_VOXEL_VOLUME)
    }

    /// Sets the volume of a voxel, returning `false` if the voxel does not exist.
    pub fn set_voxel_volume(&mut self, voxel: usize, volume: f64) -> bool {
        match self.voxel_volumes.get_mut(voxel) {
            Some(v) => {
                *v = volume;
                true
            }
            None => false,
        }
    }
}

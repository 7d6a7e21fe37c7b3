// Neutron kinematics conversions. Units throughout the crate:
// kinetic energy in eV, lengths in Å, wavevector and momentum transfer in 1/Å.

/// E[eV] * λ[Å]^2 for a free neutron (h²/2m).
pub const EKIN_WLSQ: f64 = 0.081804209605330899;

pub const TWO_PI: f64 = 2.0 * std::f64::consts::PI;

/// Lower clamp for the wavevector, so ekin = 0 stays evaluable.
pub const K_TINY: f64 = 1e-125;

/// Neutron wavelength (Å) at kinetic energy `ekin` (eV).
#[inline]
pub fn ekin_to_wavelength(ekin: f64) -> f64 {
    TWO_PI / ekin_to_wavevector(ekin)
}

/// Neutron wavevector k = 2π/λ (1/Å) at kinetic energy `ekin` (eV).
/// Clamped below by [`K_TINY`].
#[inline]
pub fn ekin_to_wavevector(ekin: f64) -> f64 {
    (TWO_PI * (ekin / EKIN_WLSQ).sqrt()).max(K_TINY)
}

/// Kinetic energy (eV) of a neutron with wavevector `k` (1/Å).
#[inline]
pub fn wavevector_to_ekin(k: f64) -> f64 {
    EKIN_WLSQ * (k / TWO_PI) * (k / TWO_PI)
}

/// Cosine of the scattering angle for an elastic event with momentum
/// transfer `q` at incident wavevector `k`: mu = 1 - q²/(2k²).
/// Always within [-1, 1].
#[inline]
pub fn q_to_mu(q: f64, k: f64) -> f64 {
    (1.0 - 0.5 * (q * q) / (k * k)).clamp(-1.0, 1.0)
}

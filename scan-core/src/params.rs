use thiserror::Error;

/// Speed of light in m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

// Fixed sensor geometry (not exposed as tunables).
pub const D: f64 = 0.1; // displacement of transmitter and receiver (m)
pub const ROH_T: f64 = 0.01; // radius of the transmitter aperture (m)
pub const ROH_R: f64 = 0.01; // radius of the receiver aperture (m)
pub const GAMMA_T_DEG: f64 = 2.0; // opening angle of the transmitter FOV (deg)
pub const GAMMA_R_DEG: f64 = 3.5; // opening angle of the receiver FOV (deg)

#[derive(Debug, Error)]
pub enum ParameterError {
    #[error("parameter '{name}' = {value} is out of range [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("parameter '{name}' = {value} must be strictly positive")]
    NotPositive { name: &'static str, value: f64 },
}

/// Valid range and display scale for one tunable parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub default: f64,
    pub min: f64,
    pub max: f64,
    pub scale: f64,
}

pub const ALPHA: ParamSpec = ParamSpec {
    default: 0.06,
    min: 0.003,
    max: 0.5,
    scale: 1000.0,
};
pub const P_0: ParamSpec = ParamSpec {
    default: 80.0,
    min: 60.0,
    max: 100.0,
    scale: 1.0,
};
pub const TAU_H: ParamSpec = ParamSpec {
    default: 2e-8,
    min: 5e-9,
    max: 8e-8,
    scale: 1e9,
};
pub const A_R: ParamSpec = ParamSpec {
    default: 0.25,
    min: 0.01,
    max: 0.1,
    scale: 1000.0,
};
pub const L_R: ParamSpec = ParamSpec {
    default: 0.05,
    min: 0.01,
    max: 0.1,
    scale: 100.0,
};
pub const GAMMA: ParamSpec = ParamSpec {
    default: 1e-6,
    min: 1e-7,
    max: 1e-5,
    scale: 1e7,
};
pub const R_1: ParamSpec = ParamSpec {
    default: 0.9,
    min: 0.0,
    max: 10.0,
    scale: 10.0,
};
pub const R_2: ParamSpec = ParamSpec {
    default: 1.0,
    min: 0.0,
    max: 10.0,
    scale: 10.0,
};
pub const R_0: ParamSpec = ParamSpec {
    default: 30.0,
    min: 1.0,
    max: 200.0,
    scale: 1.0,
};

/// Physical constants of the fog/sensor model, plus the values derived from
/// them. Immutable once built; construct through [`ParameterSetBuilder`].
#[derive(Debug, Clone)]
pub struct ParameterSet {
    /// Attenuation coefficient (amount of fog), 1/m.
    pub alpha: f64,
    /// Backscattering coefficient, 1/sr.
    pub beta: f64,
    /// Pulse peak power, W.
    pub p_0: f64,
    /// Half-power pulse width, s.
    pub tau_h: f64,
    /// Aperture area of the receiver, m^2.
    pub a_r: f64,
    /// Loss of the receiver's optics.
    pub l_r: f64,
    /// Reflectivity of the hard target.
    pub gamma: f64,
    /// Range at which the receiver FOV starts to cover the beam, m.
    pub r_1: f64,
    /// Range at which the receiver FOV fully covers the beam, m.
    pub r_2: f64,
    /// Distance to the hard target, m.
    pub r_0: f64,

    /// Meteorological optical range, m: ln(20) / alpha.
    pub mor: f64,
    /// Total pulse energy, J: p_0 * tau_h.
    pub e_p: f64,
    /// Differential reflectivity of the target: gamma / pi.
    pub beta_0: f64,
    /// Receiver aperture constant: c * l_r * a_r / 2.
    pub c_a: f64,
}

impl ParameterSet {
    pub fn builder() -> ParameterSetBuilder {
        ParameterSetBuilder::new()
    }

    /// Advisory bounds on beta; they scale with the meteorological range and
    /// are display metadata, not enforced (published presets fall outside).
    pub fn beta_bounds(&self) -> (f64, f64) {
        (0.023 / self.mor, 0.092 / self.mor)
    }
}

impl Default for ParameterSet {
    fn default() -> Self {
        ParameterSetBuilder::new()
            .build()
            .expect("defaults are valid")
    }
}

/// Builder with one typed setter per parameter. Setters validate against the
/// parameter's declared range, so an out-of-band value is rejected up front
/// instead of flowing silently into the model.
#[derive(Debug, Clone)]
pub struct ParameterSetBuilder {
    alpha: f64,
    beta: f64,
    p_0: f64,
    tau_h: f64,
    a_r: f64,
    l_r: f64,
    gamma: f64,
    r_1: f64,
    r_2: f64,
    r_0: f64,
}

fn check(name: &'static str, value: f64, spec: &ParamSpec) -> Result<f64, ParameterError> {
    if value < spec.min || value > spec.max || value.is_nan() {
        return Err(ParameterError::OutOfRange {
            name,
            value,
            min: spec.min,
            max: spec.max,
        });
    }
    Ok(value)
}

impl ParameterSetBuilder {
    pub fn new() -> Self {
        ParameterSetBuilder {
            alpha: ALPHA.default,
            beta: 0.008,
            p_0: P_0.default,
            tau_h: TAU_H.default,
            a_r: A_R.default,
            l_r: L_R.default,
            gamma: GAMMA.default,
            r_1: R_1.default,
            r_2: R_2.default,
            r_0: R_0.default,
        }
    }

    /// alpha = 0.0 is accepted as "clear air" even though it sits below the
    /// fog band; the hard-target step degenerates to a no-op there.
    pub fn alpha(mut self, value: f64) -> Result<Self, ParameterError> {
        if value != 0.0 {
            check("alpha", value, &ALPHA)?;
        }
        self.alpha = value;
        Ok(self)
    }

    pub fn beta(mut self, value: f64) -> Result<Self, ParameterError> {
        if !(value > 0.0) {
            return Err(ParameterError::NotPositive {
                name: "beta",
                value,
            });
        }
        self.beta = value;
        Ok(self)
    }

    pub fn p_0(mut self, value: f64) -> Result<Self, ParameterError> {
        self.p_0 = check("p_0", value, &P_0)?;
        Ok(self)
    }

    pub fn tau_h(mut self, value: f64) -> Result<Self, ParameterError> {
        self.tau_h = check("tau_h", value, &TAU_H)?;
        Ok(self)
    }

    pub fn a_r(mut self, value: f64) -> Result<Self, ParameterError> {
        self.a_r = check("a_r", value, &A_R)?;
        Ok(self)
    }

    pub fn l_r(mut self, value: f64) -> Result<Self, ParameterError> {
        self.l_r = check("l_r", value, &L_R)?;
        Ok(self)
    }

    pub fn gamma(mut self, value: f64) -> Result<Self, ParameterError> {
        self.gamma = check("gamma", value, &GAMMA)?;
        Ok(self)
    }

    pub fn r_1(mut self, value: f64) -> Result<Self, ParameterError> {
        self.r_1 = check("r_1", value, &R_1)?;
        Ok(self)
    }

    pub fn r_2(mut self, value: f64) -> Result<Self, ParameterError> {
        self.r_2 = check("r_2", value, &R_2)?;
        Ok(self)
    }

    pub fn r_0(mut self, value: f64) -> Result<Self, ParameterError> {
        self.r_0 = check("r_0", value, &R_0)?;
        Ok(self)
    }

    pub fn build(self) -> Result<ParameterSet, ParameterError> {
        let mor = (20.0f64).ln() / self.alpha;
        Ok(ParameterSet {
            alpha: self.alpha,
            beta: self.beta,
            p_0: self.p_0,
            tau_h: self.tau_h,
            a_r: self.a_r,
            l_r: self.l_r,
            gamma: self.gamma,
            r_1: self.r_1,
            r_2: self.r_2,
            r_0: self.r_0,
            mor,
            e_p: self.p_0 * self.tau_h,
            beta_0: self.gamma / std::f64::consts::PI,
            c_a: SPEED_OF_LIGHT * self.l_r * self.a_r / 2.0,
        })
    }
}

impl Default for ParameterSetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

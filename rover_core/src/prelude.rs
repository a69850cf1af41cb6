// rover_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::error::{MeasurementError, Result};
pub use crate::messages::{FeatureTrack, FlowFrame, MeasurementData, SensorKind};
pub use crate::models::measurement::{MeasurementModel, MeasurementPrior};

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::camera::PinholeCamera;
pub use crate::frames::Extrinsic;
pub use crate::state::layout::StateVariable;
pub use crate::state::{ErrorState, LinearizationPoint};

// --- Measurement functions ---
pub use crate::geometry::{quat_inverse, rotate_vector, skew_matrix};
pub use crate::models::measurement::{
    angular_rate_measurement, flow_odometry_measurement, odometry_measurement,
    static_vector_measurement, yaw_rate_measurement,
};

// --- Concrete Model Implementations (Export common ones for convenience) ---
pub use crate::models::measurement::{
    FlowOdometryModel, GyroscopeModel, ReferenceVectorModel, WheelOdometryModel, YawRateModel,
};

// --- Filter glue ---
pub use crate::config::SensorConfig;
pub use crate::estimation::MeasurementStack;

//! Commands sent from the main thread to the worker.

use crate::core::{BodyId, ConstraintId, TransportConfig, VehicleId, WorldConfig};
use crate::math::{Quaternion, Vector3};
use crate::protocol::{
    AnchorDescription, ConstraintDescription, ObjectDescription, VehicleDescription, WheelDescription,
};

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Names a body
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct BodyRef {
    pub id: BodyId,
}

/// Names a vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct VehicleRef {
    pub id: VehicleId,
}

/// Names a constraint
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ConstraintRef {
    pub id: ConstraintId,
}

/// Overwrites parts of a body's transform; absent parts are kept
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct TransformUpdate {
    pub id: BodyId,
    pub pos: Option<Vector3>,
    pub quat: Option<Quaternion>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct MassParams {
    pub id: BodyId,
    pub mass: f32,
}

/// A body and a vector (impulse, torque, velocity or factor)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct VectorParams {
    pub id: BodyId,
    #[cfg_attr(feature = "serialize", serde(flatten))]
    pub vector: Vector3,
}

/// A force or impulse applied away from the center of mass
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct PointForce {
    pub id: BodyId,

    /// The force or impulse
    pub vector: Vector3,

    /// Application point relative to the center of mass
    pub relative_position: Vector3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct DampingParams {
    pub id: BodyId,
    pub linear: f32,
    pub angular: f32,
}

/// A body and a single number (CCD settings)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ScalarParams {
    pub id: BodyId,
    pub value: f32,
}

/// Steering, brake or engine force for one wheel
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct WheelValue {
    pub id: VehicleId,
    pub wheel: usize,
    pub value: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ThresholdParams {
    pub id: ConstraintId,
    pub threshold: f32,
}

/// Parameters of one `simulate` call
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct SimulateParams {
    /// Seconds to advance; wall-clock time since the last call when absent
    pub time_step: Option<f32>,

    /// Sub-step cap; enough to cover `time_step` when absent
    pub max_sub_steps: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct HingeLimits {
    pub id: ConstraintId,
    pub low: f32,
    pub high: f32,
    pub bias_factor: f32,
    pub relaxation_factor: f32,
}

/// Target velocity and impulse cap of a motor
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct MotorParams {
    pub id: ConstraintId,
    pub velocity: f32,
    pub max_impulse: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct SliderLimits {
    pub id: ConstraintId,
    pub linear_lower: f32,
    pub linear_upper: f32,
    pub angular_lower: f32,
    pub angular_upper: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct SliderRestitution {
    pub id: ConstraintId,
    pub linear: f32,
    pub angular: f32,
}

/// Swing spans and twist span of a cone-twist joint
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ConeTwistLimit {
    pub id: ConstraintId,
    pub swing_span1: f32,
    pub swing_span2: f32,
    pub twist_span: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct FlagParams {
    pub id: ConstraintId,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ImpulseLimit {
    pub id: ConstraintId,
    pub max_impulse: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ConeTwistMotorTarget {
    pub id: ConstraintId,
    pub target: Quaternion,
}

/// A 6-DOF limit vector
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct DofLimit {
    pub id: ConstraintId,
    #[cfg_attr(feature = "serialize", serde(flatten))]
    pub limit: Vector3,
}

/// Selects one rotational axis of a 6-DOF joint (0 = X, 1 = Y, 2 = Z)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct DofAxis {
    pub id: ConstraintId,
    pub which: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct DofMotorConfig {
    pub id: ConstraintId,
    pub which: usize,
    pub low_angle: f32,
    pub high_angle: f32,
    pub velocity: f32,
    pub max_force: f32,
}

/// A command for the worker.
///
/// Serialized as `{"cmd": name, "params": ...}` with the worker's wire names.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialize",
    derive(Serialize, Deserialize),
    serde(tag = "cmd", content = "params", rename_all = "camelCase")
)]
pub enum Command {
    Init(TransportConfig),
    MakeWorld(WorldConfig),
    SetFixedTimeStep(f32),
    SetGravity(Vector3),
    AppendAnchor(AnchorDescription),

    AddObject(Box<ObjectDescription>),
    RemoveObject(BodyRef),
    UpdateTransform(TransformUpdate),
    UpdateMass(MassParams),
    ApplyCentralImpulse(VectorParams),
    ApplyImpulse(PointForce),
    ApplyTorque(VectorParams),
    ApplyCentralForce(VectorParams),
    ApplyForce(PointForce),
    SetAngularVelocity(VectorParams),
    SetLinearVelocity(VectorParams),
    SetAngularFactor(VectorParams),
    SetLinearFactor(VectorParams),
    SetDamping(DampingParams),
    SetCcdMotionThreshold(ScalarParams),
    SetCcdSweptSphereRadius(ScalarParams),

    AddVehicle(VehicleDescription),
    RemoveVehicle(VehicleRef),
    AddWheel(WheelDescription),
    SetSteering(WheelValue),
    SetBrake(WheelValue),
    ApplyEngineForce(WheelValue),

    AddConstraint(ConstraintDescription),
    RemoveConstraint(ConstraintRef),
    #[cfg_attr(feature = "serialize", serde(rename = "constraint_setBreakingImpulseThreshold"))]
    ConstraintSetBreakingImpulseThreshold(ThresholdParams),

    #[cfg_attr(feature = "serialize", serde(rename = "hinge_setLimits"))]
    HingeSetLimits(HingeLimits),
    #[cfg_attr(feature = "serialize", serde(rename = "hinge_enableAngularMotor"))]
    HingeEnableAngularMotor(MotorParams),
    #[cfg_attr(feature = "serialize", serde(rename = "hinge_disableMotor"))]
    HingeDisableMotor(ConstraintRef),

    #[cfg_attr(feature = "serialize", serde(rename = "slider_setLimits"))]
    SliderSetLimits(SliderLimits),
    #[cfg_attr(feature = "serialize", serde(rename = "slider_setRestitution"))]
    SliderSetRestitution(SliderRestitution),
    #[cfg_attr(feature = "serialize", serde(rename = "slider_enableLinearMotor"))]
    SliderEnableLinearMotor(MotorParams),
    #[cfg_attr(feature = "serialize", serde(rename = "slider_disableLinearMotor"))]
    SliderDisableLinearMotor(ConstraintRef),
    #[cfg_attr(feature = "serialize", serde(rename = "slider_enableAngularMotor"))]
    SliderEnableAngularMotor(MotorParams),
    #[cfg_attr(feature = "serialize", serde(rename = "slider_disableAngularMotor"))]
    SliderDisableAngularMotor(ConstraintRef),

    #[cfg_attr(feature = "serialize", serde(rename = "conetwist_setLimit"))]
    ConeTwistSetLimit(ConeTwistLimit),
    #[cfg_attr(feature = "serialize", serde(rename = "conetwist_setAngularOnly"))]
    ConeTwistSetAngularOnly(FlagParams),
    #[cfg_attr(feature = "serialize", serde(rename = "conetwist_enableMotor"))]
    ConeTwistEnableMotor(ConstraintRef),
    #[cfg_attr(feature = "serialize", serde(rename = "conetwist_setMaxMotorImpulse"))]
    ConeTwistSetMaxMotorImpulse(ImpulseLimit),
    #[cfg_attr(feature = "serialize", serde(rename = "conetwist_setMotorTarget"))]
    ConeTwistSetMotorTarget(ConeTwistMotorTarget),
    #[cfg_attr(feature = "serialize", serde(rename = "conetwist_disableMotor"))]
    ConeTwistDisableMotor(ConstraintRef),

    #[cfg_attr(feature = "serialize", serde(rename = "dof_setLinearLowerLimit"))]
    DofSetLinearLowerLimit(DofLimit),
    #[cfg_attr(feature = "serialize", serde(rename = "dof_setLinearUpperLimit"))]
    DofSetLinearUpperLimit(DofLimit),
    #[cfg_attr(feature = "serialize", serde(rename = "dof_setAngularLowerLimit"))]
    DofSetAngularLowerLimit(DofLimit),
    #[cfg_attr(feature = "serialize", serde(rename = "dof_setAngularUpperLimit"))]
    DofSetAngularUpperLimit(DofLimit),
    #[cfg_attr(feature = "serialize", serde(rename = "dof_enableAngularMotor"))]
    DofEnableAngularMotor(DofAxis),
    #[cfg_attr(feature = "serialize", serde(rename = "dof_configureAngularMotor"))]
    DofConfigureAngularMotor(DofMotorConfig),
    #[cfg_attr(feature = "serialize", serde(rename = "dof_disableAngularMotor"))]
    DofDisableAngularMotor(DofAxis),

    OnSimulationResume,
    Simulate(SimulateParams),

    /// A command name this build does not handle
    #[cfg_attr(feature = "serialize", serde(skip))]
    Unknown(String),
}

impl Command {
    /// The wire name of the command
    pub fn name(&self) -> &str {
        match self {
            Self::Init(_) => "init",
            Self::MakeWorld(_) => "makeWorld",
            Self::SetFixedTimeStep(_) => "setFixedTimeStep",
            Self::SetGravity(_) => "setGravity",
            Self::AppendAnchor(_) => "appendAnchor",
            Self::AddObject(_) => "addObject",
            Self::RemoveObject(_) => "removeObject",
            Self::UpdateTransform(_) => "updateTransform",
            Self::UpdateMass(_) => "updateMass",
            Self::ApplyCentralImpulse(_) => "applyCentralImpulse",
            Self::ApplyImpulse(_) => "applyImpulse",
            Self::ApplyTorque(_) => "applyTorque",
            Self::ApplyCentralForce(_) => "applyCentralForce",
            Self::ApplyForce(_) => "applyForce",
            Self::SetAngularVelocity(_) => "setAngularVelocity",
            Self::SetLinearVelocity(_) => "setLinearVelocity",
            Self::SetAngularFactor(_) => "setAngularFactor",
            Self::SetLinearFactor(_) => "setLinearFactor",
            Self::SetDamping(_) => "setDamping",
            Self::SetCcdMotionThreshold(_) => "setCcdMotionThreshold",
            Self::SetCcdSweptSphereRadius(_) => "setCcdSweptSphereRadius",
            Self::AddVehicle(_) => "addVehicle",
            Self::RemoveVehicle(_) => "removeVehicle",
            Self::AddWheel(_) => "addWheel",
            Self::SetSteering(_) => "setSteering",
            Self::SetBrake(_) => "setBrake",
            Self::ApplyEngineForce(_) => "applyEngineForce",
            Self::AddConstraint(_) => "addConstraint",
            Self::RemoveConstraint(_) => "removeConstraint",
            Self::ConstraintSetBreakingImpulseThreshold(_) => "constraint_setBreakingImpulseThreshold",
            Self::HingeSetLimits(_) => "hinge_setLimits",
            Self::HingeEnableAngularMotor(_) => "hinge_enableAngularMotor",
            Self::HingeDisableMotor(_) => "hinge_disableMotor",
            Self::SliderSetLimits(_) => "slider_setLimits",
            Self::SliderSetRestitution(_) => "slider_setRestitution",
            Self::SliderEnableLinearMotor(_) => "slider_enableLinearMotor",
            Self::SliderDisableLinearMotor(_) => "slider_disableLinearMotor",
            Self::SliderEnableAngularMotor(_) => "slider_enableAngularMotor",
            Self::SliderDisableAngularMotor(_) => "slider_disableAngularMotor",
            Self::ConeTwistSetLimit(_) => "conetwist_setLimit",
            Self::ConeTwistSetAngularOnly(_) => "conetwist_setAngularOnly",
            Self::ConeTwistEnableMotor(_) => "conetwist_enableMotor",
            Self::ConeTwistSetMaxMotorImpulse(_) => "conetwist_setMaxMotorImpulse",
            Self::ConeTwistSetMotorTarget(_) => "conetwist_setMotorTarget",
            Self::ConeTwistDisableMotor(_) => "conetwist_disableMotor",
            Self::DofSetLinearLowerLimit(_) => "dof_setLinearLowerLimit",
            Self::DofSetLinearUpperLimit(_) => "dof_setLinearUpperLimit",
            Self::DofSetAngularLowerLimit(_) => "dof_setAngularLowerLimit",
            Self::DofSetAngularUpperLimit(_) => "dof_setAngularUpperLimit",
            Self::DofEnableAngularMotor(_) => "dof_enableAngularMotor",
            Self::DofConfigureAngularMotor(_) => "dof_configureAngularMotor",
            Self::DofDisableAngularMotor(_) => "dof_disableAngularMotor",
            Self::OnSimulationResume => "onSimulationResume",
            Self::Simulate(_) => "simulate",
            Self::Unknown(name) => name,
        }
    }

    /// Whether the command may run before `makeWorld`
    pub fn is_handshake(&self) -> bool {
        matches!(self, Self::Init(_) | Self::MakeWorld(_))
    }
}

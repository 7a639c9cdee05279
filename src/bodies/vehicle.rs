use crate::bodies::RigidBody;
use crate::core::{BodyHandle, HandleStorage};
use crate::error::PhysicsError;
use crate::math::{self, Vector3, Quaternion, Transform, Ray};
use crate::Result;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Suspension and tire parameters shared by a vehicle and its wheels
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize), serde(default))]
pub struct VehicleTuning {
    /// Spring stiffness
    pub suspension_stiffness: f32,

    /// Damping while the spring compresses
    pub suspension_compression: f32,

    /// Damping while the spring relaxes
    pub suspension_damping: f32,

    /// Maximum spring travel in centimeters
    pub max_suspension_travel_cm: f32,

    /// Tire grip
    pub friction_slip: f32,

    /// Cap on the spring force
    pub max_suspension_force: f32,
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            suspension_stiffness: 5.88,
            suspension_compression: 0.83,
            suspension_damping: 0.88,
            max_suspension_travel_cm: 500.0,
            friction_slip: 10.5,
            max_suspension_force: 6000.0,
        }
    }
}

/// How much side impulses roll the chassis
const ROLL_INFLUENCE: f32 = 0.1;

/// Forward impulses count half when deciding whether a tire slides
const FORWARD_SLIP_WEIGHT: f32 = 0.5;

/// State of one wheel
#[derive(Debug, Clone)]
pub struct WheelInfo {
    /// Suspension hard point in chassis space
    pub connection_point: Vector3,

    /// Suspension direction in chassis space
    pub direction: Vector3,

    /// Axle in chassis space
    pub axle: Vector3,

    /// Spring length at rest
    pub suspension_rest_length: f32,

    /// Wheel radius
    pub radius: f32,

    /// Tuning of this wheel
    pub tuning: VehicleTuning,

    /// Whether the wheel steers
    pub is_front_wheel: bool,

    /// Steering angle in radians
    pub steering: f32,

    /// Force pushed through the tire
    pub engine_force: f32,

    /// Brake impulse limit
    pub brake: f32,

    /// Accumulated roll angle
    pub rotation: f32,

    /// Roll angle change of the last step
    pub delta_rotation: f32,

    /// Current spring length
    pub suspension_length: f32,

    /// Spring force of the last step
    pub suspension_force: f32,

    /// Whether the wheel touches the ground
    pub in_contact: bool,

    /// Ground contact point in world space
    pub contact_point: Vector3,

    /// Ground normal in world space
    pub contact_normal: Vector3,

    /// Body the wheel rests on
    pub ground: Option<BodyHandle>,

    /// Wheel transform in world space
    pub world_transform: Transform,
}

impl WheelInfo {
    fn max_travel(&self) -> f32 {
        self.tuning.max_suspension_travel_cm * 0.01
    }
}

/// A raycast vehicle driving a rigid chassis
#[derive(Debug, Clone)]
pub struct RaycastVehicle {
    chassis: BodyHandle,
    tuning: VehicleTuning,
    wheels: Vec<WheelInfo>,
    current_speed_kmh: f32,
}

impl RaycastVehicle {
    /// Creates a vehicle with no wheels
    pub fn new(chassis: BodyHandle, tuning: VehicleTuning) -> Self {
        Self {
            chassis,
            tuning,
            wheels: Vec::new(),
            current_speed_kmh: 0.0,
        }
    }

    /// Returns the chassis handle
    pub fn get_chassis(&self) -> BodyHandle {
        self.chassis
    }

    /// Returns the vehicle's default tuning
    pub fn get_tuning(&self) -> &VehicleTuning {
        &self.tuning
    }

    /// Appends a wheel and returns its index
    #[allow(clippy::too_many_arguments)]
    pub fn add_wheel(
        &mut self,
        connection_point: Vector3,
        direction: Vector3,
        axle: Vector3,
        suspension_rest_length: f32,
        radius: f32,
        tuning: VehicleTuning,
        is_front_wheel: bool,
    ) -> usize {
        self.wheels.push(WheelInfo {
            connection_point,
            direction: direction.normalize(),
            axle: axle.normalize(),
            suspension_rest_length,
            radius,
            tuning,
            is_front_wheel,
            steering: 0.0,
            engine_force: 0.0,
            brake: 0.0,
            rotation: 0.0,
            delta_rotation: 0.0,
            suspension_length: suspension_rest_length,
            suspension_force: 0.0,
            in_contact: false,
            contact_point: Vector3::zero(),
            contact_normal: Vector3::zero(),
            ground: None,
            world_transform: Transform::identity(),
        });
        self.wheels.len() - 1
    }

    /// Number of wheels
    pub fn get_num_wheels(&self) -> usize {
        self.wheels.len()
    }

    /// Returns a wheel by index
    pub fn get_wheel(&self, index: usize) -> Option<&WheelInfo> {
        self.wheels.get(index)
    }

    /// Returns the world transform of a wheel as of the last update
    pub fn get_wheel_transform(&self, index: usize) -> Option<Transform> {
        self.wheels.get(index).map(|w| w.world_transform)
    }

    fn wheel_mut(&mut self, index: usize) -> Result<&mut WheelInfo> {
        let count = self.wheels.len();
        self.wheels
            .get_mut(index)
            .ok_or_else(|| PhysicsError::ResourceNotFound(format!("wheel {index} of {count}")))
    }

    /// Sets a wheel's steering angle
    pub fn set_steering_value(&mut self, index: usize, value: f32) -> Result<()> {
        self.wheel_mut(index)?.steering = value;
        Ok(())
    }

    /// Sets a wheel's brake
    pub fn set_brake(&mut self, index: usize, value: f32) -> Result<()> {
        self.wheel_mut(index)?.brake = value;
        Ok(())
    }

    /// Sets a wheel's engine force
    pub fn apply_engine_force(&mut self, index: usize, value: f32) -> Result<()> {
        self.wheel_mut(index)?.engine_force = value;
        Ok(())
    }

    /// Chassis speed along its forward (+Z) axis in km/h
    pub fn get_current_speed_km_hour(&self) -> f32 {
        self.current_speed_kmh
    }

    /// Recomputes wheel transforms from the chassis pose without moving anything
    pub fn update_wheel_transforms(&mut self, chassis: &Transform) {
        for wheel in &mut self.wheels {
            wheel.world_transform = wheel_transform(wheel, chassis);
        }
    }

    /// Runs suspension, friction and wheel roll for one fixed step
    pub fn update(&mut self, dt: f32, bodies: &mut HandleStorage<BodyHandle, RigidBody>) -> Result<()> {
        let chassis_transform = bodies.get_or_err(self.chassis)?.get_transform();

        for wheel in &mut self.wheels {
            cast_wheel(wheel, self.chassis, &chassis_transform, bodies);
        }

        let chassis = bodies.get_mut_or_err(self.chassis)?;
        let forward_ws = chassis_transform.transform_direction(Vector3::unit_z());
        self.current_speed_kmh = chassis.get_linear_velocity().dot(&forward_ws) * 3.6;

        if chassis.is_dynamic() {
            let mass = chassis.get_mass();
            for wheel in &mut self.wheels {
                apply_suspension(wheel, chassis, &chassis_transform, mass, dt);
            }
            apply_friction(&mut self.wheels, chassis, &chassis_transform, dt);
        }

        for wheel in &mut self.wheels {
            roll_wheel(wheel, chassis, &chassis_transform, dt);
            wheel.world_transform = wheel_transform(wheel, &chassis_transform);
        }
        Ok(())
    }
}

fn steered_axle(wheel: &WheelInfo, chassis: &Transform) -> Vector3 {
    let up = -wheel.direction;
    let steer = Quaternion::from_axis_angle(up, wheel.steering);
    chassis.transform_direction(steer.rotate_vector(wheel.axle))
}

fn cast_wheel(wheel: &mut WheelInfo, chassis_handle: BodyHandle, chassis: &Transform, bodies: &HandleStorage<BodyHandle, RigidBody>) {
    let origin = chassis.transform_point(wheel.connection_point);
    let direction = chassis.transform_direction(wheel.direction);
    let ray = Ray::new(origin, direction);
    let reach = wheel.suspension_rest_length + wheel.radius;

    let hit = bodies
        .iter()
        .filter(|(handle, _)| *handle != chassis_handle)
        .filter_map(|(handle, body)| {
            body.get_shape()
                .intersects_ray(&ray, &body.get_transform(), reach)
                .map(|hit| (handle, hit))
        })
        .min_by(|a, b| a.1.distance.total_cmp(&b.1.distance));

    match hit {
        Some((handle, hit)) => {
            let travel = wheel.max_travel();
            let min_length = (wheel.suspension_rest_length - travel).max(0.0);
            let max_length = wheel.suspension_rest_length + travel;
            wheel.suspension_length = (hit.distance - wheel.radius).clamp(min_length, max_length);
            wheel.in_contact = true;
            wheel.contact_point = ray.point_at(hit.distance);
            wheel.contact_normal = hit.normal;
            wheel.ground = Some(handle);
        }
        None => {
            wheel.suspension_length = wheel.suspension_rest_length;
            wheel.in_contact = false;
            wheel.contact_normal = -direction;
            wheel.ground = None;
        }
    }
}

fn apply_suspension(wheel: &mut WheelInfo, chassis: &mut RigidBody, transform: &Transform, mass: f32, dt: f32) {
    if !wheel.in_contact {
        wheel.suspension_force = 0.0;
        return;
    }

    let direction = transform.transform_direction(wheel.direction);
    let relative = wheel.contact_point - transform.position;
    let denominator = wheel.contact_normal.dot(&direction);
    let (relative_velocity, inv_contact_dot) = if denominator >= -0.1 {
        (0.0, 10.0)
    } else {
        let inv = -1.0 / denominator;
        (wheel.contact_normal.dot(&chassis.get_velocity_at(relative)) * inv, inv)
    };

    let compression = wheel.suspension_rest_length - wheel.suspension_length;
    let mut force = wheel.tuning.suspension_stiffness * compression * inv_contact_dot;
    let damping = if relative_velocity < 0.0 {
        wheel.tuning.suspension_compression
    } else {
        wheel.tuning.suspension_damping
    };
    force -= damping * relative_velocity;
    wheel.suspension_force = (force * mass).clamp(0.0, wheel.tuning.max_suspension_force);

    chassis.apply_impulse(wheel.contact_normal * (wheel.suspension_force * dt), relative);
}

fn effective_mass(chassis: &RigidBody, relative: Vector3, direction: Vector3) -> f32 {
    let arm = relative.cross(&direction);
    let angular = math::mul_matrix_vector(chassis.get_inverse_inertia_tensor_world(), arm).dot(&arm);
    let denominator = chassis.get_inverse_mass() + angular;
    if denominator > math::EPSILON {
        1.0 / denominator
    } else {
        0.0
    }
}

fn apply_friction(wheels: &mut [WheelInfo], chassis: &mut RigidBody, transform: &Transform, dt: f32) {
    for wheel in wheels.iter_mut() {
        if !wheel.in_contact {
            continue;
        }
        let normal = wheel.contact_normal;
        let axle = steered_axle(wheel, transform);
        let side = (axle - normal * axle.dot(&normal)).normalize();
        let forward = normal.cross(&side).normalize();
        let relative = wheel.contact_point - transform.position;
        let velocity = chassis.get_velocity_at(relative);

        let mut side_impulse = -velocity.dot(&side) * effective_mass(chassis, relative, side);

        let mut forward_impulse = if wheel.engine_force != 0.0 {
            wheel.engine_force * dt
        } else if wheel.brake > 0.0 {
            let rolling = -velocity.dot(&forward) * effective_mass(chassis, relative, forward);
            rolling.clamp(-wheel.brake, wheel.brake)
        } else {
            0.0
        };

        let max_impulse = wheel.suspension_force * dt * wheel.tuning.friction_slip;
        let weighted = forward_impulse * FORWARD_SLIP_WEIGHT;
        let magnitude = (weighted * weighted + side_impulse * side_impulse).sqrt();
        if magnitude > max_impulse && magnitude > 0.0 {
            let skid = max_impulse / magnitude;
            forward_impulse *= skid;
            side_impulse *= skid;
        }

        if forward_impulse != 0.0 {
            chassis.apply_impulse(forward * forward_impulse, relative);
        }
        if side_impulse != 0.0 {
            let up = -transform.transform_direction(wheel.direction);
            let rolled = relative - up * (relative.dot(&up) * (1.0 - ROLL_INFLUENCE));
            chassis.apply_impulse(side * side_impulse, rolled);
        }
    }
}

fn roll_wheel(wheel: &mut WheelInfo, chassis: &RigidBody, transform: &Transform, dt: f32) {
    if wheel.in_contact && wheel.radius > 0.0 {
        let axle = steered_axle(wheel, transform);
        let forward = wheel.contact_normal.cross(&axle).normalize();
        let relative = wheel.contact_point - transform.position;
        let speed = chassis.get_velocity_at(relative).dot(&forward);
        wheel.delta_rotation = speed * dt / wheel.radius;
    } else {
        wheel.delta_rotation *= 0.99;
    }
    wheel.rotation += wheel.delta_rotation;
}

fn wheel_transform(wheel: &WheelInfo, chassis: &Transform) -> Transform {
    let up = -wheel.direction;
    let steer = Quaternion::from_axis_angle(up, wheel.steering);
    let roll = Quaternion::from_axis_angle(wheel.axle, -wheel.rotation);
    let position = wheel.connection_point + wheel.direction * wheel.suspension_length;
    Transform::new(
        chassis.transform_point(position),
        (chassis.rotation * steer * roll).normalize(),
    )
}

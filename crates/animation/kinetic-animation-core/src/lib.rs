//! Kinetic Animation Core (host-agnostic)
//!
//! Time-driven property animation: tweens resolved from per-target parameters,
//! a progress setter that samples them, an instance state machine that turns
//! wall-clock ticks into lifecycle notifications, timelines composing instances
//! at offsets, and stagger generators for per-element values.
//!
//! Nothing here touches a scene graph directly. Hosts implement
//! [`PropertyHost`] to resolve targets, report original values and receive
//! writes; an external frame source drives [`Engine::tick`].

pub mod binding;
pub mod completion;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod ids;
pub mod instance;
pub mod interp;
pub mod loader;
pub mod params;
pub mod path;
pub mod sampling;
pub mod stagger;
pub mod timeline;
pub mod value;

// Re-exports for consumers (hosts)
pub use binding::{AnimationType, ObjectHost, PropertyHost, TargetHandle};
pub use completion::Completion;
pub use config::{Direction, EngineConfig, InstanceSettings, LoopCount, TweenSettings};
pub use data::{build_animations, Animation, Tween};
pub use engine::Engine;
pub use error::AnimationError;
pub use ids::{IdAllocator, InstanceId};
pub use instance::{Instance, InstanceState, Remaining};
pub use interp::functions::{EaseMode, PennerFamily, SpringParams};
pub use interp::{parse_easing, CustomEasing, Easing};
pub use loader::{parse_animation_json, parse_timeline_json, TimelineSpec};
pub use params::{
    AnimeParams, Keyframe, KeyframeValue, LifecycleEvent, ParamValue, PropertyValue, TimelineOffset,
    TimelineParams, TweenOverrides, TweenParams,
};
pub use path::{MotionPath, PathProperty, PathValue, Point, Polyline, Viewport};
pub use sampling::{resolve_value, set_animations_progress};
pub use stagger::{stagger, Axis, Stagger, StaggerFrom, StaggerOptions, StaggerValue};
pub use timeline::{instance_timings, Timed, Timings};
pub use value::{RawValue, TweenValue};

pub type Result<T> = std::result::Result<T, AnimationError>;

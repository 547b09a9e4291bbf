use tracing::debug;

use crate::component::{Mass, Spring};
use crate::config::ModelConfig;
use crate::error::{Error, Result};
use crate::model::Model;

/// A full copy of every spring and mass, in the order the model lists them.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneSnapshot {
    springs: Vec<Spring>,
    masses: Vec<Mass>,
}

impl SceneSnapshot {
    pub fn new(springs: Vec<Spring>, masses: Vec<Mass>) -> SceneSnapshot {
        SceneSnapshot { springs, masses }
    }

    pub fn springs(&self) -> &[Spring] {
        &self.springs
    }

    pub fn masses(&self) -> &[Mass] {
        &self.masses
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpringLengthMode {
    SameLength,
    AdjustableLength,
}

/// What stays fixed when the first spring's length is changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstantParameter {
    SpringConstant,
    Thickness,
}

/// Index of the spring whose length can be adjusted.
const ADJUSTABLE_SPRING: usize = 0;

/// A [`Model`] with two scenes: one where both springs share a length and one where the first
/// spring's length can be changed. Each scene keeps its own state while the other is shown.
pub struct IntroModel {
    model: Model,
    length_mode: SpringLengthMode,
    constant_parameter: ConstantParameter,
    same_length_scene: SceneSnapshot,
    adjustable_length_scene: SceneSnapshot,
}

impl IntroModel {
    pub fn new(config: ModelConfig) -> Result<IntroModel> {
        let mut model = Model::new(config)?;
        let (same_length_scene, adjustable_length_scene) = build_scenes(&mut model)?;
        Ok(IntroModel {
            model,
            length_mode: SpringLengthMode::SameLength,
            constant_parameter: ConstantParameter::SpringConstant,
            same_length_scene,
            adjustable_length_scene,
        })
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    pub fn length_mode(&self) -> SpringLengthMode {
        self.length_mode
    }

    pub fn constant_parameter(&self) -> ConstantParameter {
        self.constant_parameter
    }

    /// Stashes the scene being left and puts the other one back as it was, under the model's
    /// current gravity and friction.
    pub fn set_spring_length_mode(&mut self, length_mode: SpringLengthMode) -> Result<()> {
        if length_mode == self.length_mode {
            return Ok(());
        }

        let leaving = self.model.snapshot()?;
        let entering = match length_mode {
            SpringLengthMode::SameLength => {
                self.adjustable_length_scene = leaving;
                &self.same_length_scene
            }
            SpringLengthMode::AdjustableLength => {
                self.same_length_scene = leaving;
                &self.adjustable_length_scene
            }
        };
        self.model.restore(entering)?;
        self.model.reapply_globals()?;
        self.length_mode = length_mode;
        debug!(?length_mode, "switched scene");
        Ok(())
    }

    /// Picks what stays fixed when the first spring's length changes. In the adjustable-length
    /// scene the chosen parameter is put back to its starting value and the other one is derived
    /// from it.
    pub fn set_constant_parameter(&mut self, constant_parameter: ConstantParameter) -> Result<()> {
        self.constant_parameter = constant_parameter;
        if self.length_mode != SpringLengthMode::AdjustableLength {
            return Ok(());
        }

        self.model.modify_spring(ADJUSTABLE_SPRING, |spring| {
            match constant_parameter {
                ConstantParameter::SpringConstant => spring.reset_spring_constant(),
                ConstantParameter::Thickness => spring.reset_thickness(),
            }
            Ok(())
        })
    }

    /// Only the same-length scene redraws the thickness to follow the new constant.
    pub fn set_spring_constant(&mut self, index: usize, spring_constant: f64) -> Result<()> {
        match self.length_mode {
            SpringLengthMode::SameLength => self.model.set_spring_constant(index, spring_constant),
            SpringLengthMode::AdjustableLength => self
                .model
                .modify_spring(index, |spring| spring.set_spring_constant(spring_constant)),
        }
    }

    /// Changes the first spring's length, holding either its stiffness or its thickness and
    /// deriving the other.
    pub fn set_natural_length(&mut self, length: f64) -> Result<()> {
        if self.length_mode != SpringLengthMode::AdjustableLength {
            return Err(Error::LengthNotAdjustable);
        }

        let constant_parameter = self.constant_parameter;
        self.model.modify_spring(ADJUSTABLE_SPRING, |spring| {
            let thickness = spring.thickness();
            spring.set_natural_resting_length(length)?;
            match constant_parameter {
                ConstantParameter::SpringConstant => {
                    spring.update_thickness(length, spring.spring_constant())
                }
                ConstantParameter::Thickness => spring.update_spring_constant(length, thickness),
            }
            Ok(())
        })
    }

    pub fn reset(&mut self) -> Result<()> {
        self.model.reset()?;
        let (same_length_scene, adjustable_length_scene) = build_scenes(&mut self.model)?;
        self.same_length_scene = same_length_scene;
        self.adjustable_length_scene = adjustable_length_scene;
        self.length_mode = SpringLengthMode::SameLength;
        self.constant_parameter = ConstantParameter::SpringConstant;
        Ok(())
    }
}

/// Captures the freshly built model as the same-length scene, derives the adjustable scene from it
/// by halving the first spring, then puts the same-length scene back.
fn build_scenes(model: &mut Model) -> Result<(SceneSnapshot, SceneSnapshot)> {
    let same_length_scene = model.snapshot()?;

    let spring = model.spring_entity(ADJUSTABLE_SPRING)?;
    let half_length = model.spring(spring)?.natural_resting_length() / 2.0;
    model.set_natural_resting_length(ADJUSTABLE_SPRING, half_length)?;
    let adjustable_length_scene = model.snapshot()?;

    model.restore(&same_length_scene)?;
    Ok((same_length_scene, adjustable_length_scene))
}

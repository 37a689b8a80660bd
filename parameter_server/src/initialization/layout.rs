use std::{cell::RefCell, rc::Rc};

use machine_learning::arch::Layout;
use rand::Rng;

use super::{ChainedParamGen, ConstParamGen, ParamGen, RandParamGen, Result};

const POLICY_WEIGHT_STD: f32 = 0.01;

/// Builds the initializer of an actor-critic layout.
///
/// Hidden and value weights use Glorot uniform, the policy weights a narrow normal so the
/// initial policy is close to uniform, and every bias starts at zero.
///
/// # Arguments
/// * `rng` - The shared random number generator.
/// * `layout` - The layout to initialize.
///
/// # Returns
/// A generator that yields exactly `layout.len()` values.
pub fn layout_param_gen<R: Rng + 'static>(
    rng: Rc<RefCell<R>>,
    layout: &Layout,
) -> Result<ChainedParamGen> {
    let mut param_gens: Vec<Box<dyn ParamGen>> = Vec::with_capacity(layout.tensors().len());

    for tensor in layout.tensors() {
        let len = tensor.len();

        let param_gen: Box<dyn ParamGen> = match tensor.shape.as_slice() {
            [_] => Box::new(ConstParamGen::new(0., len)),
            _ if tensor.name.starts_with("policy") => Box::new(RandParamGen::normal(
                rng.clone(),
                len,
                0.,
                POLICY_WEIGHT_STD,
            )?),
            [fan_in, fan_out] => Box::new(RandParamGen::xavier_uniform(
                rng.clone(),
                len,
                *fan_in,
                *fan_out,
            )?),
            _ => Box::new(RandParamGen::xavier_uniform(rng.clone(), len, len, 1)?),
        };

        param_gens.push(param_gen);
    }

    Ok(ChainedParamGen::new(param_gens))
}

/// Computes the discounted returns of a reward sequence.
///
/// `G_{k-1} = r_{k-1}` and `G_i = r_i + gamma * G_{i+1}`.
///
/// # Arguments
/// * `rewards` - The rewards in the order they were collected.
/// * `gamma` - The discount factor.
///
/// # Returns
/// One return per reward, in the same order.
pub fn discounted_returns(rewards: &[f32], gamma: f32) -> Vec<f32> {
    let mut returns = vec![0.; rewards.len()];
    let mut acc = 0.;

    for (ret, &reward) in returns.iter_mut().zip(rewards).rev() {
        acc = reward + gamma * acc;
        *ret = acc;
    }

    returns
}

/// Computes the n-step returns of a rollout.
///
/// A truncated rollout carries the value estimate of the state that follows its last
/// transition. That estimate is discounted in as if it were one more reward, and the return
/// computed for its own position is dropped.
///
/// # Arguments
/// * `rewards` - The rewards of the rollout.
/// * `gamma` - The discount factor.
/// * `bootstrap` - `None` if the rollout ended on a terminal state, the value of the next
///   state otherwise.
///
/// # Returns
/// Exactly `rewards.len()` returns.
pub fn n_step_returns(rewards: &[f32], gamma: f32, bootstrap: Option<f32>) -> Vec<f32> {
    let Some(value) = bootstrap else {
        return discounted_returns(rewards, gamma);
    };

    let mut extended = Vec::with_capacity(rewards.len() + 1);
    extended.extend_from_slice(rewards);
    extended.push(value);

    let mut returns = discounted_returns(&extended, gamma);
    returns.pop();
    returns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(got: &[f32], expected: &[f32]) {
        assert_eq!(got.len(), expected.len());
        for (g, e) in got.iter().zip(expected) {
            assert!((g - e).abs() < 1e-5, "{got:?} != {expected:?}");
        }
    }

    #[test]
    fn terminal_rollout() {
        let returns = n_step_returns(&[1., 1., 1.], 0.9, None);
        assert_close(&returns, &[2.71, 1.9, 1.0]);
    }

    #[test]
    fn truncated_rollout_bootstraps() {
        let returns = n_step_returns(&[1., 1.], 0.9, Some(5.));
        assert_close(&returns, &[5.95, 5.5]);
    }

    #[test]
    fn single_transition() {
        assert_close(&n_step_returns(&[2.], 0.5, Some(4.)), &[4.]);
        assert_close(&n_step_returns(&[2.], 0.5, None), &[2.]);
    }

    #[test]
    fn length_is_preserved_on_both_branches() {
        let rewards: Vec<f32> = (0..17).map(|i| (i as f32 * 0.37).sin()).collect();

        for k in 0..rewards.len() {
            let rewards = &rewards[..k];
            assert_eq!(n_step_returns(rewards, 0.99, None).len(), k);
            assert_eq!(n_step_returns(rewards, 0.99, Some(1.5)).len(), k);
        }
    }

    #[test]
    fn zero_discount_returns_rewards() {
        let rewards = [0.5, -1., 3.];
        assert_close(&n_step_returns(&rewards, 0., Some(100.)), &rewards);
    }
}

use std::{collections::HashMap, env, fs, num::NonZeroUsize, path::PathBuf, process};

use comms::specs::{
    model::{ActFnSpec, ModelSpec},
    worker::TrainingSpec,
};
use environments::{Environment, Step};
use machine_learning::checkpoint::Checkpoint;
use worker::{SyncClient, Worker, WorkerErr, metrics::Scalar, model::LocalModel};

type Result<T> = std::result::Result<T, WorkerErr>;

/// Three steps to the end of a corridor, 1 reward per step, states count the steps taken.
struct Corridor {
    t: usize,
}

impl Environment for Corridor {
    fn reset(&mut self) -> Vec<f32> {
        self.t = 0;
        vec![0.]
    }

    fn step(&mut self, _action: usize) -> Step {
        self.t += 1;
        Step {
            state: vec![self.t as f32],
            reward: 1.,
            done: self.t == 3,
            info: HashMap::new(),
        }
    }

    fn actions(&self) -> usize {
        1
    }

    fn observation_size(&self) -> usize {
        1
    }
}

/// Records every request, the global parameters never change.
#[derive(Default)]
struct Recorder {
    params: Vec<f32>,
    pulls: usize,
    pushed: Vec<Vec<f32>>,
    snapshots: usize,
}

impl SyncClient for Recorder {
    async fn pull(&mut self, local: &mut [f32]) -> Result<()> {
        self.pulls += 1;
        local.copy_from_slice(&self.params);
        Ok(())
    }

    async fn push(&mut self, grad: &[f32]) -> Result<()> {
        self.pushed.push(grad.to_vec());
        Ok(())
    }

    async fn snapshot(&mut self) -> Result<(u64, Vec<f32>)> {
        self.snapshots += 1;
        Ok((self.pushed.len() as u64, self.params.clone()))
    }

    async fn optimizer_stats(&mut self) -> Result<Vec<(String, f32)>> {
        Ok(Vec::new())
    }

    async fn disconnect(&mut self) -> Result<()> {
        Ok(())
    }
}

fn model_spec() -> ModelSpec {
    ModelSpec::ActorCritic {
        input: 1,
        hidden: vec![3],
        actions: 1,
        act_fn: ActFnSpec::Tanh,
    }
}

fn training(max_steps: usize, rollout_len: usize, ckpt_freq: usize, ckpt_path: PathBuf) -> TrainingSpec {
    TrainingSpec {
        max_steps,
        rollout_len: NonZeroUsize::new(rollout_len).unwrap(),
        gamma: 0.9,
        entropy_coef: 0.01,
        ckpt_freq: NonZeroUsize::new(ckpt_freq).unwrap(),
        ckpt_path,
        summary_freq: NonZeroUsize::new(100).unwrap(),
    }
}

fn recorder(model: &LocalModel) -> Recorder {
    let size = model.layout().len();
    Recorder {
        params: (0..size).map(|i| ((i * 7 % 5) as f32 - 2.) * 0.1).collect(),
        ..Default::default()
    }
}

fn scratch(name: &str) -> PathBuf {
    env::temp_dir().join(format!("a3c-worker-{name}-{}", process::id()))
}

#[tokio::test]
async fn one_episode_pushes_the_gradient_of_the_discounted_returns() -> Result<()> {
    let model = LocalModel::new(&model_spec())?;
    let mut server = recorder(&model);
    let training = training(3, 5, 100, scratch("unused").join("network.ckpt"));

    let mut worker = Worker::new(1, Corridor { t: 0 }, model, training, Vec::<Scalar>::new(), 0);
    let stats = worker.run(&mut server).await?;

    assert_eq!(stats.steps, 3);
    assert_eq!(stats.updates, 1);
    assert_eq!(server.pulls, 1);
    assert_eq!(server.pushed.len(), 1);

    let mut expected = LocalModel::new(&model_spec())?;
    expected.params_mut().copy_from_slice(&server.params);
    let (grad, _) = expected.compute_gradients(&[0., 1., 2.], &[0, 0, 0], &[2.71, 1.9, 1.0], 0.01)?;

    for (got, expected) in server.pushed[0].iter().zip(grad) {
        assert!((got - expected).abs() < 1e-5, "{got} != {expected}");
    }

    let episode_sums: Vec<&Scalar> = worker
        .metrics()
        .iter()
        .filter(|s| s.name == "worker_1/rl/episode_value_sum")
        .collect();
    assert_eq!(episode_sums.len(), 1);

    Ok(())
}

#[tokio::test]
async fn elected_worker_checkpoints_every_ckpt_freq_updates() -> Result<()> {
    let dir = scratch("elected");
    let _ = fs::remove_dir_all(&dir);
    let path = dir.join("network.ckpt");

    let model = LocalModel::new(&model_spec())?;
    let layout = model.layout().clone();
    let mut server = recorder(&model);

    // 10 single step rollouts.
    let training = training(10, 1, 3, path.clone());
    let mut worker = Worker::new(0, Corridor { t: 0 }, model, training, Vec::<Scalar>::new(), 0);
    let stats = worker.run(&mut server).await?;

    assert_eq!(stats.updates, 10);
    assert_eq!(server.snapshots, 3);

    let checkpoint = Checkpoint::load(&path).unwrap();
    assert_eq!(checkpoint.updates, 9);
    assert_eq!(checkpoint.layout, layout);
    assert_eq!(checkpoint.params, server.params);

    fs::remove_dir_all(&dir).unwrap();
    Ok(())
}

#[tokio::test]
async fn other_workers_never_checkpoint() -> Result<()> {
    let path = scratch("other").join("network.ckpt");

    let model = LocalModel::new(&model_spec())?;
    let mut server = recorder(&model);

    let training = training(10, 1, 3, path.clone());
    let mut worker = Worker::new(2, Corridor { t: 0 }, model, training, Vec::<Scalar>::new(), 0);
    worker.run(&mut server).await?;

    assert_eq!(server.snapshots, 0);
    assert!(!path.exists());
    Ok(())
}

#[tokio::test]
async fn failed_save_does_not_stop_training() -> Result<()> {
    let dir = scratch("blocked");
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();

    // The checkpoint's parent is a regular file.
    let blocker = dir.join("blocker");
    fs::write(&blocker, b"").unwrap();
    let path = blocker.join("network.ckpt");

    let model = LocalModel::new(&model_spec())?;
    let mut server = recorder(&model);

    let training = training(4, 1, 2, path.clone());
    let mut worker = Worker::new(0, Corridor { t: 0 }, model, training, Vec::<Scalar>::new(), 0);
    let stats = worker.run(&mut server).await?;

    assert_eq!(stats.updates, 4);
    assert_eq!(server.snapshots, 2);
    assert!(!path.exists());

    fs::remove_dir_all(&dir).unwrap();
    Ok(())
}

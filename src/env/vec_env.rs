use super::{Env, EnvError};

/// A fixed set of private environment copies, one per rollout worker.
///
/// Workers borrow an environment by value for the length of a batch and hand
/// it back afterwards. A copy that never comes back (the worker died) is
/// rebuilt from the prototype on the next checkout.
pub struct VecEnv<E> {
    envs: Vec<Option<E>>,
    prototype: E,
}

impl<E: Env + Clone> VecEnv<E> {
    pub fn replicate(prototype: &E, num_envs: usize) -> Self {
        let envs = (0..num_envs).map(|_| Some(prototype.clone())).collect();
        Self {
            envs,
            prototype: prototype.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.envs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.envs.is_empty()
    }

    pub fn checkout(&mut self, index: usize) -> E {
        match self.envs[index].take() {
            Some(env) => env,
            None => {
                tracing::debug!(index, "rebuilding worker environment from prototype");
                self.prototype.clone()
            }
        }
    }

    pub fn checkin(&mut self, index: usize, env: E) -> Result<(), EnvError> {
        if index >= self.envs.len() {
            return Err(EnvError::Other(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "worker index doesn't match environment count",
            ))));
        }
        self.envs[index] = Some(env);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{PointMass, RenderMode};

    #[test]
    fn lost_copy_is_rebuilt_from_prototype() {
        let mut prototype = PointMass::default();
        prototype.reset(3).unwrap();
        let mut envs = VecEnv::replicate(&prototype, 2);

        let mut borrowed = envs.checkout(1);
        borrowed.step(&[1.0, 1.0], RenderMode::Off).unwrap();
        assert_ne!(borrowed.get_state(), prototype.get_state());
        drop(borrowed);

        let rebuilt = envs.checkout(1);
        assert_eq!(rebuilt.get_state(), prototype.get_state());
        envs.checkin(1, rebuilt).unwrap();
        assert!(envs.checkin(2, prototype.clone()).is_err());
    }
}

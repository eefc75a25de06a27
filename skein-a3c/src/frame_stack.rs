//! Fixed-depth stack of processed observation frames.
use ndarray::{concatenate, s, Array1, Axis};

/// Holds the most recent frames, flattened oldest-to-newest into the
/// state vector fed to the model.
#[derive(Clone, Debug)]
pub struct FrameStack {
    frame_len: usize,
    state: Array1<f32>,
}

impl FrameStack {
    /// Builds a stack by tiling the initial frame to the given depth.
    pub fn new(depth: usize, frame: &Array1<f32>) -> Self {
        let frame_len = frame.len();
        let mut state = Array1::zeros(depth * frame_len);
        for i in 0..depth {
            state
                .slice_mut(s![i * frame_len..(i + 1) * frame_len])
                .assign(frame);
        }
        Self { frame_len, state }
    }

    /// Drops the oldest frame and appends `frame` as the newest.
    pub fn push(&mut self, frame: &Array1<f32>) {
        debug_assert_eq!(frame.len(), self.frame_len);
        self.state = concatenate![
            Axis(0),
            self.state.slice(s![self.frame_len..]),
            frame.view()
        ];
    }

    /// The flattened state, oldest frame first.
    pub fn state(&self) -> &Array1<f32> {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::FrameStack;
    use ndarray::Array1;

    #[test]
    fn initial_stack_tiles_the_first_frame() {
        let frame = Array1::from(vec![1.0, 2.0]);
        let stack = FrameStack::new(3, &frame);
        assert_eq!(
            stack.state().to_vec(),
            vec![1.0, 2.0, 1.0, 2.0, 1.0, 2.0]
        );
    }

    #[test]
    fn push_drops_oldest_and_preserves_order() {
        let stack0 = Array1::from_elem(84, 0.0);
        let mut stack = FrameStack::new(4, &stack0);

        let f1 = Array1::from_elem(84, 1.0);
        stack.push(&f1);

        // New stack is the previous stack's last 3 frames followed by the
        // new frame, oldest first.
        let state = stack.state();
        assert_eq!(state.len(), 4 * 84);
        assert!(state.slice(ndarray::s![..3 * 84]).iter().all(|v| *v == 0.0));
        assert!(state.slice(ndarray::s![3 * 84..]).iter().all(|v| *v == 1.0));

        let f2 = Array1::from_elem(84, 2.0);
        stack.push(&f2);
        let state = stack.state();
        assert!(state.slice(ndarray::s![..2 * 84]).iter().all(|v| *v == 0.0));
        assert!(state
            .slice(ndarray::s![2 * 84..3 * 84])
            .iter()
            .all(|v| *v == 1.0));
        assert!(state.slice(ndarray::s![3 * 84..]).iter().all(|v| *v == 2.0));
    }
}

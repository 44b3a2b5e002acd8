use clap::Parser;

pub mod check;
pub mod train;

#[derive(Parser)]
#[command(name = "backprop", about = "Gradient checks and toy training loops for backproplib layers")]
pub enum CLI {
    /// Compare analytic gradients of every layer with numerical ones.
    Check(check::CheckCli),

    /// Train a small affine-relu-affine regressor on a synthetic dataset.
    Train(train::TrainCli)
}

impl CLI {
    #[inline]
    pub fn execute(self) -> anyhow::Result<()> {
        match self {
            Self::Check(command) => command.execute(),
            Self::Train(command) => command.execute()
        }
    }
}

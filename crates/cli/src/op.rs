use blobs::Client;

/// Shared state handed to every command.
#[derive(Debug, Clone)]
pub struct OpContext {
    pub client: Client,
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;
    type Output: std::fmt::Display + Send;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

/// Generate a clap subcommand enum plus the matching error/output enums and
/// an `Op` impl dispatching to each variant.
#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $ty:ty)),* $(,)?) => {
        #[derive(clap::Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($ty),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$ty as $crate::op::Op>::Error),
            )*
        }

        pub enum OpOutput {
            $($variant(<$ty as $crate::op::Op>::Output),)*
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(OpOutput::$variant(output) => write!(f, "{output}"),)*
                }
            }
        }

        #[async_trait::async_trait]
        impl $crate::op::Op for Command {
            type Error = OpError;
            type Output = OpOutput;

            async fn execute(
                &self,
                ctx: &$crate::op::OpContext,
            ) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => <$ty as $crate::op::Op>::execute(op, ctx)
                            .await
                            .map(OpOutput::$variant)
                            .map_err(OpError::$variant),
                    )*
                }
            }
        }
    };
}

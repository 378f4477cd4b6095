//! Rules for which port kinds may share a node.

use crate::error::{GraphError, GraphResult};
use crate::port::PortKind;
use tlm_core::NodeId;

/// Check the kinds a node would carry after a connection.
///
/// System ports are neutral: they stand in for whatever sits on the other
/// side of the system boundary.
pub(crate) fn check_kinds<I>(node: Option<NodeId>, kinds: I) -> GraphResult<()>
where
    I: IntoIterator<Item = PortKind>,
{
    let (mut power, mut write, mut read, mut total) = (0usize, 0usize, 0usize, 0usize);
    for kind in kinds {
        total += 1;
        match kind {
            PortKind::Power => power += 1,
            PortKind::Write => write += 1,
            PortKind::Read => read += 1,
            PortKind::System => {}
        }
    }

    if power > 2 {
        return Err(GraphError::TooManyPowerPorts { node });
    }
    if write > 1 {
        return Err(GraphError::MultipleWriters { node });
    }
    if power > 0 && write > 0 {
        return Err(GraphError::PowerAndWrite { node });
    }
    if total >= 2 && read == total {
        return Err(GraphError::ReadOnlyNode);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use PortKind::*;

    #[test]
    fn accepted_combinations() {
        assert!(check_kinds(None, [Power, Power]).is_ok());
        assert!(check_kinds(None, [Write, Read]).is_ok());
        assert!(check_kinds(None, [Write, Read, Read, Read]).is_ok());
        assert!(check_kinds(None, [System, Read]).is_ok());
        assert!(check_kinds(None, [Power, System]).is_ok());
    }

    #[test]
    fn rejected_combinations() {
        assert_eq!(
            check_kinds(None, [Power, Power, Power]),
            Err(GraphError::TooManyPowerPorts { node: None })
        );
        assert_eq!(
            check_kinds(None, [Write, Write]),
            Err(GraphError::MultipleWriters { node: None })
        );
        assert_eq!(
            check_kinds(None, [Power, Write]),
            Err(GraphError::PowerAndWrite { node: None })
        );
        assert_eq!(check_kinds(None, [Read, Read]), Err(GraphError::ReadOnlyNode));
    }
}

use xbee_schema::{frame_schemas, FrameSchema};

use crate::cmd::{parse_frame_type, Direction, TypesArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_layout, print_type_list, OutputFormat};

pub fn run(args: TypesArgs, format: OutputFormat) -> CliResult<i32> {
    if let Some(name) = &args.frame_type {
        let frame_type = parse_frame_type(name)?;
        print_layout(frame_type.schema(), format);
        return Ok(SUCCESS);
    }

    let schemas = filter_by_direction(frame_schemas(), args.direction);
    print_type_list(&schemas, format);
    Ok(SUCCESS)
}

fn filter_by_direction(schemas: &[FrameSchema], direction: Option<Direction>) -> Vec<FrameSchema> {
    schemas
        .iter()
        .filter(|schema| match direction {
            None => true,
            Some(Direction::Inbound) => schema.frame_type.is_inbound(),
            Some(Direction::Outbound) => !schema.frame_type.is_inbound(),
        })
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_filter_partitions_registry() {
        let all = frame_schemas();
        let inbound = filter_by_direction(all, Some(Direction::Inbound));
        let outbound = filter_by_direction(all, Some(Direction::Outbound));

        assert_eq!(inbound.len() + outbound.len(), all.len());
        assert!(inbound.iter().all(|s| s.frame_type.id() >= 0x80));
        assert!(outbound.iter().all(|s| s.frame_type.id() < 0x80));
        assert_eq!(filter_by_direction(all, None).len(), all.len());
    }
}

//! The dump's statement templates
//!
//! Every block of dump text comes from one of these. Placeholders read the
//! session values captured at connect time (`%(character_set_client)`,
//! `%(version)`) or the sub-tree of the object being written
//! (`%(table.ident)`, `%(routine.create)`, ...).

use sqldump_templates::TemplateSet;

pub const PROLOGUE: &str = "prologue";
pub const EPILOGUE: &str = "epilogue";
pub const DUMP_COMPLETED: &str = "dump_completed";
pub const DUMP_COMPLETED_UNDATED: &str = "dump_completed_undated";
pub const TEMP_VIEW: &str = "temp_view";
pub const TABLE_STRUCTURE: &str = "table_structure";
pub const TABLE_DATA_BEGIN: &str = "table_data_begin";
pub const TABLE_INSERT: &str = "table_insert";
pub const TABLE_DATA_END: &str = "table_data_end";
pub const ROUTINES_HEADER: &str = "routines_header";
pub const ROUTINE: &str = "routine";
pub const TRIGGERS_HEADER: &str = "triggers_header";
pub const TRIGGER: &str = "trigger";
pub const VIEW: &str = "view";
pub const EVENTS: &str = "events";

const PROLOGUE_SQL: &str = r#"-- %(generator)
--
-- Host: %(host)    Database: %(database)
-- ------------------------------------------------------
-- Server version	%(version)

/*!40101 SET @OLD_CHARACTER_SET_CLIENT=@@CHARACTER_SET_CLIENT */;
/*!40101 SET @OLD_CHARACTER_SET_RESULTS=@@CHARACTER_SET_RESULTS */;
/*!40101 SET @OLD_COLLATION_CONNECTION=@@COLLATION_CONNECTION */;
/*!40101 SET NAMES %(character_set_client) */;
/*!40103 SET @OLD_TIME_ZONE=@@TIME_ZONE */;
/*!40103 SET TIME_ZONE='+00:00' */;
/*!40014 SET @OLD_UNIQUE_CHECKS=@@UNIQUE_CHECKS, UNIQUE_CHECKS=0 */;
/*!40014 SET @OLD_FOREIGN_KEY_CHECKS=@@FOREIGN_KEY_CHECKS, FOREIGN_KEY_CHECKS=0 */;
/*!40101 SET @OLD_SQL_MODE=@@SQL_MODE, SQL_MODE='NO_AUTO_VALUE_ON_ZERO' */;
/*!40111 SET @OLD_SQL_NOTES=@@SQL_NOTES, SQL_NOTES=0 */;
"#;

const EPILOGUE_SQL: &str = r#"
/*!40103 SET TIME_ZONE=@OLD_TIME_ZONE */;

/*!40101 SET SQL_MODE=@OLD_SQL_MODE */;
/*!40014 SET FOREIGN_KEY_CHECKS=@OLD_FOREIGN_KEY_CHECKS */;
/*!40014 SET UNIQUE_CHECKS=@OLD_UNIQUE_CHECKS */;
/*!40101 SET CHARACTER_SET_CLIENT=@OLD_CHARACTER_SET_CLIENT */;
/*!40101 SET CHARACTER_SET_RESULTS=@OLD_CHARACTER_SET_RESULTS */;
/*!40101 SET COLLATION_CONNECTION=@OLD_COLLATION_CONNECTION */;
/*!40111 SET SQL_NOTES=@OLD_SQL_NOTES */;
"#;

const TEMP_VIEW_SQL: &str = r#"
--
-- Temporary view structure for view `%(table.ident)`
--

DROP TABLE IF EXISTS `%(table.ident)`;
/*!50001 DROP VIEW IF EXISTS `%(table.ident)`*/;
/*!40101 SET @saved_cs_client     = @@character_set_client */;
/*!40101 SET character_set_client = %(character_set_client) */;
/*!50001 CREATE TABLE `%(table.ident)` (
%(table.columns)
) ENGINE=MyISAM */;
/*!40101 SET character_set_client = @saved_cs_client */;
"#;

const TABLE_STRUCTURE_SQL: &str = r#"
--
-- Table structure for table `%(table.ident)`
--

DROP TABLE IF EXISTS `%(table.ident)`;
/*!40101 SET @saved_cs_client     = @@character_set_client */;
/*!40101 SET character_set_client = %(character_set_client) */;
%(table.create);
/*!40101 SET character_set_client = @saved_cs_client */;
"#;

const TABLE_DATA_BEGIN_SQL: &str = r#"
--
-- Dumping data for table `%(table.ident)`
--

LOCK TABLES `%(table.ident)` WRITE;
/*!40000 ALTER TABLE `%(table.ident)` DISABLE KEYS */;
"#;

const TABLE_DATA_END_SQL: &str = r#"/*!40000 ALTER TABLE `%(table.ident)` ENABLE KEYS */;
UNLOCK TABLES;
"#;

const ROUTINES_HEADER_SQL: &str = r#"
--
-- Dumping routines for database '%(database)'
--
"#;

const ROUTINE_SQL: &str = r#"/*!50003 DROP %(routine.kind) IF EXISTS `%(routine.ident)` */;
/*!50003 SET @saved_cs_client      = @@character_set_client */ ;
/*!50003 SET @saved_cs_results     = @@character_set_results */ ;
/*!50003 SET @saved_col_connection = @@collation_connection */ ;
/*!50003 SET character_set_client  = %(routine.character_set_client) */ ;
/*!50003 SET character_set_results = %(routine.character_set_client) */ ;
/*!50003 SET collation_connection  = %(routine.collation_connection) */ ;
/*!50003 SET @saved_sql_mode       = @@sql_mode */ ;
/*!50003 SET sql_mode              = '%(routine.sql_mode)' */ ;
DELIMITER ;;
%(routine.create) ;;
DELIMITER ;
/*!50003 SET sql_mode              = @saved_sql_mode */ ;
/*!50003 SET character_set_client  = @saved_cs_client */ ;
/*!50003 SET character_set_results = @saved_cs_results */ ;
/*!50003 SET collation_connection  = @saved_col_connection */ ;
"#;

const TRIGGERS_HEADER_SQL: &str = r#"
--
-- Dumping triggers for database '%(database)'
--
"#;

const TRIGGER_SQL: &str = r#"/*!50003 DROP TRIGGER IF EXISTS `%(trigger.ident)` */;
/*!50003 SET @saved_cs_client      = @@character_set_client */ ;
/*!50003 SET @saved_cs_results     = @@character_set_results */ ;
/*!50003 SET @saved_col_connection = @@collation_connection */ ;
/*!50003 SET character_set_client  = %(trigger.character_set_client) */ ;
/*!50003 SET character_set_results = %(trigger.character_set_client) */ ;
/*!50003 SET collation_connection  = %(trigger.collation_connection) */ ;
/*!50003 SET @saved_sql_mode       = @@sql_mode */ ;
/*!50003 SET sql_mode              = '%(trigger.sql_mode)' */ ;
DELIMITER ;;
%(trigger.create) ;;
DELIMITER ;
/*!50003 SET sql_mode              = @saved_sql_mode */ ;
/*!50003 SET character_set_client  = @saved_cs_client */ ;
/*!50003 SET character_set_results = @saved_cs_results */ ;
/*!50003 SET collation_connection  = @saved_col_connection */ ;
"#;

const VIEW_SQL: &str = r#"
--
-- Final view structure for view `%(view.ident)`
--

/*!50001 DROP TABLE IF EXISTS `%(view.ident)`*/;
/*!50001 DROP VIEW IF EXISTS `%(view.ident)`*/;
/*!50001 SET @saved_cs_client          = @@character_set_client */;
/*!50001 SET @saved_cs_results         = @@character_set_results */;
/*!50001 SET @saved_col_connection     = @@collation_connection */;
/*!50001 SET character_set_client      = %(view.character_set_client) */;
/*!50001 SET character_set_results     = %(view.character_set_client) */;
/*!50001 SET collation_connection      = %(view.collation_connection) */;
/*!50001 CREATE %(view.algorithm) */
/*!50013 %(view.definer) %(view.security) */
/*!50001 VIEW %(view.body) */;
/*!50001 SET character_set_client      = @saved_cs_client */;
/*!50001 SET character_set_results     = @saved_cs_results */;
/*!50001 SET collation_connection      = @saved_col_connection */;
"#;

/// Build the template set used by every dump.
pub fn dump_templates() -> TemplateSet {
    TemplateSet::new()
        .with_template(PROLOGUE, PROLOGUE_SQL)
        .with_template(EPILOGUE, EPILOGUE_SQL)
        .with_template(DUMP_COMPLETED, "\n-- Dump completed on %(dump_completed)")
        .with_template(DUMP_COMPLETED_UNDATED, "\n-- Dump completed")
        .with_template(TEMP_VIEW, TEMP_VIEW_SQL)
        .with_template(TABLE_STRUCTURE, TABLE_STRUCTURE_SQL)
        .with_template(TABLE_DATA_BEGIN, TABLE_DATA_BEGIN_SQL)
        .with_template(TABLE_INSERT, "INSERT INTO `%(table.ident)` VALUES")
        .with_template(TABLE_DATA_END, TABLE_DATA_END_SQL)
        .with_template(ROUTINES_HEADER, ROUTINES_HEADER_SQL)
        .with_template(ROUTINE, ROUTINE_SQL)
        .with_template(TRIGGERS_HEADER, TRIGGERS_HEADER_SQL)
        .with_template(TRIGGER, TRIGGER_SQL)
        .with_template(VIEW, VIEW_SQL)
        // No event support yet; the phase renders this and writes nothing.
        .with_template(EVENTS, "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use sqldump_templates::Context;

    #[test]
    fn test_all_templates_registered() {
        let templates = dump_templates();
        for name in [
            PROLOGUE,
            EPILOGUE,
            DUMP_COMPLETED,
            DUMP_COMPLETED_UNDATED,
            TEMP_VIEW,
            TABLE_STRUCTURE,
            TABLE_DATA_BEGIN,
            TABLE_INSERT,
            TABLE_DATA_END,
            ROUTINES_HEADER,
            ROUTINE,
            TRIGGERS_HEADER,
            TRIGGER,
            VIEW,
            EVENTS,
        ] {
            assert!(templates.contains(name), "{name} missing");
        }
        assert_eq!(templates.len(), 15);
    }

    #[test]
    fn test_bodies_have_no_trailing_newline() {
        let templates = dump_templates();
        assert!(!templates.get(PROLOGUE).unwrap().ends_with('\n'));
        assert!(!templates.get(TABLE_DATA_END).unwrap().ends_with('\n'));
    }

    #[test]
    fn test_table_structure_render() {
        let mut ctx = Context::new();
        ctx.set("character_set_client", "utf8mb4");
        ctx.replace(
            "table",
            &json!({ "ident": "t", "create": "CREATE TABLE `t` (\n  `id` int\n)" }),
        )
        .unwrap();

        let rendered = dump_templates().render(TABLE_STRUCTURE, &ctx).unwrap();
        assert!(rendered.is_complete());
        assert_eq!(
            rendered.text,
            indoc! {"

                --
                -- Table structure for table `t`
                --

                DROP TABLE IF EXISTS `t`;
                /*!40101 SET @saved_cs_client     = @@character_set_client */;
                /*!40101 SET character_set_client = utf8mb4 */;
                CREATE TABLE `t` (
                  `id` int
                );
                /*!40101 SET character_set_client = @saved_cs_client */;"}
        );
    }
}

//! SQL text for target selects, source selects, and batched statements.
//!
//! Target statements use the `{values}` marker expanded by the executor
//! into placeholder groups; most join the bound rows against `mineral_log`
//! to resolve mineral names or Mindat ids into MR surrogate ids, and all of
//! them RETURN the written rows for the audit reports.

// ---------------------------------------------------------------------------
// Target (MR) selects

pub const GET_MINERAL_LOG: &str =
    "SELECT ml.id, ml.name, ml.note, ml.created_at, ml.updated_at, ml.seen, ml.description, \
     ml.mindat_id, ml.ima_symbol FROM mineral_log ml;";

pub const GET_MINERAL_HISTORY: &str =
    "SELECT mh.id, ml.name, mh.discovery_year, mh.ima_year, mh.approval_year, mh.publication_year \
     FROM mineral_history mh \
     INNER JOIN mineral_log ml on mh.mineral_id = ml.id;";

pub const GET_MINERAL_FORMULA: &str =
    "SELECT ml.name, ml.mindat_id, mf.formula, mf.note, mf.source_id \
     FROM mineral_formula mf \
     INNER JOIN mineral_log ml ON mf.mineral_id = ml.id \
     WHERE mf.source_id > 1;";

pub const GET_MINERAL_CRYSTALLOGRAPHY: &str =
    "SELECT ml.name, ml.mindat_id, csl.name as crystal_system \
     FROM mineral_crystallography mc \
     INNER JOIN mineral_log ml ON mc.mineral_id = ml.id \
     INNER JOIN crystal_system_list csl ON mc.crystal_system_id = csl.id;";

pub const GET_MINERAL_RELATION_SUGGESTION: &str =
    "SELECT mrs.id, ml.mindat_id as mineral_id, ml_.mindat_id as relation_id, mrs.relation_type_id \
     FROM mineral_relation_suggestion mrs \
     INNER JOIN mineral_log ml on ml.id = mrs.mineral_id \
     INNER JOIN mineral_log ml_ on ml_.id = mrs.relation_id;";

pub const GET_MINERAL_CONTEXT: &str =
    "SELECT ml.name, mc.data, mc.context_id \
     FROM mineral_context mc \
     INNER JOIN mineral_log ml ON mc.mineral_id = ml.id;";

// ---------------------------------------------------------------------------
// Source (Mindat) selects

pub const GET_MINERALS: &str = r#"
    SELECT ml.id AS mindat_id, ml.name AS name, ml.ima_status AS ima_status, ml.ima_notes AS ima_note,
    ml.dispformulasimple AS formula, ml.imaformula as imaformula, ml.formulanotes AS note, ml.imayear AS ima_year,
    ml.yeardiscovery AS discovery_year, ml.approval_year AS approval_year, ml.publication_year AS publication_year,
    ml.description, ml.shortcode_ima AS ima_symbol, ml.csystem as crystal_system,
    NULLIF(ml.colour, '') as physical_color,
    NULLIF(ml.diapheny, '') as physical_transparency,
    CAST(NULLIF(NULLIF(ml.dmeas, ''), 0) AS DECIMAL(5,3)) as physical_densityMeasuredMin,
    CAST(NULLIF(NULLIF(ml.dmeas2, ''), 0) AS DECIMAL(5,3)) as physical_densityMeasuredMax,
    CAST(NULLIF(NULLIF(ml.dcalc, ''), 0) AS DECIMAL(5,3)) as physical_densityCalculated,
    CASE WHEN NULLIF(ml.hmin, '') = 0 THEN NULL ELSE NULLIF(ml.hmin, '') END as physical_hardnessMin,
    CASE WHEN NULLIF(ml.hmax, '') = 0 THEN NULL ELSE NULLIF(ml.hmax, '') END as physical_hardnessMax,
    NULLIF(ml.tenacity, '') as physical_tenacity,
    NULLIF(ml.cleavagetype, '') as physical_cleavage,
    NULLIF(ml.fracturetype, '') as physical_fracture,
    NULLIF(ml.luminescence, '') as physical_luminescence,
    NULLIF(ml.lustretype, '') as physical_lustre,
    NULLIF(ml.streak, '') as physical_streak,
    NULLIF(ml.opticaltype, '') as optical_type,
    NULLIF(ml.opticalsign, '') as optical_sign,
    NULLIF(ml.opticalextinction, '') as optical_extinction,
    NULLIF(ml.opticaldispersion, '') as optical_dispersion,
    NULLIF(ml.opticalpleochroism, '') as optical_pleochroism,
    NULLIF(ml.opticalbirefringence, '') as optical_birefringence,
    NULLIF(ml.opticalcolour, '') as optical_color,
    NULLIF(ml.opticaltropic, '') as optical_tropic,
    NULLIF(ml.opticalanisotropism, '') as optical_anisotropism,
    NULLIF(ml.opticalbireflectance, '') as optical_bireflectance,
    NULLIF(ml.opticalr, '') as optical_r
    FROM minerals ml
    WHERE ml.id IN (
        SELECT ml.id
        FROM minerals ml
        WHERE ml.name REGEXP '^[A-Za-z0-9]+'
    );
"#;

pub const GET_RELATIONS: &str =
    "SELECT r.rid as id, r.min1 AS mineral_id, r.min2 AS relation_id, r.rel as relation_type_id \
     FROM relations r;";

// ---------------------------------------------------------------------------
// Target (MR) batched statements

pub const INSERT_MINERAL_LOG: &str =
    "INSERT INTO mineral_log AS ml (name, description, mindat_id, ima_symbol) VALUES {values} \
     RETURNING ml.id, ml.name, ml.description, ml.mindat_id, ml.ima_symbol;";

pub const UPDATE_MINERAL_LOG: &str =
    "UPDATE mineral_log AS ml SET \
     description = new.description, \
     mindat_id = new.mindat_id::int, \
     ima_symbol = new.ima_symbol \
     FROM (VALUES {values}) AS new (id, description, mindat_id, ima_symbol) \
     WHERE ml.id::uuid = new.id::uuid \
     RETURNING ml.id, ml.name, ml.description, ml.mindat_id, ml.ima_symbol;";

pub const INSERT_MINERAL_HISTORY: &str =
    "WITH ins (id, mineral_id, discovery_year, ima_year, approval_year, publication_year) AS ( \
        INSERT INTO mineral_history AS mh (mineral_id, discovery_year, ima_year, approval_year, publication_year) \
        SELECT ml.id, new.discovery_year::smallint, new.ima_year::smallint, new.approval_year::smallint, \
        new.publication_year::smallint \
        FROM (VALUES {values}) AS new (name, discovery_year, ima_year, approval_year, publication_year) \
        INNER JOIN mineral_log AS ml ON ml.name = new.name \
        RETURNING mh.id, mh.mineral_id, mh.discovery_year, mh.ima_year, mh.approval_year, mh.publication_year \
     ) \
     SELECT ml.name, ml.id AS mineral_id, ins.id, ins.discovery_year, ins.ima_year, ins.approval_year, \
            ins.publication_year \
     FROM ins \
     INNER JOIN mineral_log ml ON ml.id = ins.mineral_id;";

pub const UPDATE_MINERAL_HISTORY: &str =
    "WITH upd (id, mineral_id, discovery_year, ima_year, approval_year, publication_year) AS ( \
     UPDATE mineral_history AS mh SET \
     discovery_year = new.discovery_year::smallint, \
     ima_year = new.ima_year::smallint, \
     approval_year = new.approval_year::smallint, \
     publication_year = new.publication_year::smallint \
     FROM (VALUES {values}) \
     AS new (id, discovery_year, ima_year, approval_year, publication_year) \
     WHERE mh.id = new.id \
     RETURNING mh.id, mh.mineral_id, mh.discovery_year, mh.ima_year, mh.approval_year, mh.publication_year \
     ) \
     SELECT ml.name, ml.id AS mineral_id, upd.id, upd.discovery_year, upd.ima_year, upd.approval_year, \
            upd.publication_year \
     FROM upd \
     INNER JOIN mineral_log ml ON ml.id = upd.mineral_id;";

pub const INSERT_MINERAL_FORMULA: &str =
    "WITH ins (id, mineral_id, formula, note, source_id) AS ( \
        INSERT INTO mineral_formula AS mf (mineral_id, formula, note, source_id) \
        SELECT ml.id, new.formula, new.note, new.source_id \
        FROM (VALUES {values}) AS new (name, formula, note, source_id) \
        INNER JOIN mineral_log AS ml on ml.name = new.name \
        RETURNING mf.id, mf.mineral_id, mf.formula, mf.note, mf.source_id, mf.created_at \
     ) \
     SELECT ml.name, ml.id AS mineral_id, ins.id, ins.formula, ins.note, ins.source_id, ins.created_at \
     FROM ins \
     INNER JOIN mineral_log ml ON ml.id = ins.mineral_id;";

pub const INSERT_MINERAL_CRYSTALLOGRAPHY: &str =
    "WITH ins (id, mineral_id, crystal_system_id) AS ( \
        INSERT INTO mineral_crystallography AS mc (mineral_id, crystal_system_id) \
        SELECT ml.id, csl.id \
        FROM (VALUES {values}) AS new (name, crystal_system) \
        INNER JOIN mineral_log AS ml on ml.name = new.name \
        INNER JOIN crystal_system_list AS csl on csl.name = new.crystal_system \
        RETURNING mc.id, mc.mineral_id, mc.crystal_system_id \
     ) \
     SELECT ml.name, ml.id AS mineral_id, ins.id, ins.crystal_system_id \
     FROM ins \
     INNER JOIN mineral_log ml ON ml.id = ins.mineral_id;";

pub const UPDATE_MINERAL_CRYSTALLOGRAPHY: &str =
    "WITH upd (id, mineral_id, crystal_system_id) AS ( \
     UPDATE mineral_crystallography AS mc SET \
     crystal_system_id = csl.id \
     FROM (VALUES {values}) AS new (mineral_name, crystal_system_name) \
     INNER JOIN mineral_log ml ON ml.name = new.mineral_name \
     INNER JOIN crystal_system_list csl ON csl.name = new.crystal_system_name \
     WHERE mc.mineral_id = ml.id \
     RETURNING mc.id, mc.mineral_id, mc.crystal_system_id \
     ) \
     SELECT ml.name, ml.id AS mineral_id, upd.id, csl.name as crystal_system_name \
     FROM upd \
     INNER JOIN mineral_log ml ON ml.id = upd.mineral_id \
     INNER JOIN crystal_system_list csl ON upd.crystal_system_id = csl.id;";

pub const INSERT_MINERAL_RELATION_SUGGESTION: &str =
    "INSERT INTO mineral_relation_suggestion as mrs (id, mineral_id, relation_id, relation_type_id) \
     SELECT new.id::int, ml.id, ml_.id, new.relation_type_id::int \
     FROM (VALUES {values}) AS new (id, mineral_id, relation_id, relation_type_id) \
     INNER JOIN mineral_log ml ON ml.mindat_id = new.mineral_id \
     INNER JOIN mineral_log ml_ ON ml_.mindat_id = new.relation_id \
     RETURNING mrs.id, mrs.mineral_id, mrs.relation_id, mrs.relation_type_id;";

pub const UPDATE_MINERAL_RELATION_SUGGESTION: &str =
    "UPDATE mineral_relation_suggestion AS mrs SET \
     mineral_id = ml.id, \
     relation_id = ml_.id, \
     relation_type_id = new.relation_type_id, \
     is_processed = FALSE \
     FROM (VALUES {values}) AS new (id, mineral_id, relation_id, relation_type_id) \
     INNER JOIN mineral_log ml ON ml.mindat_id = new.mineral_id \
     INNER JOIN mineral_log ml_ ON ml_.mindat_id = new.relation_id \
     WHERE mrs.id = new.id \
     RETURNING mrs.id, mrs.mineral_id, mrs.relation_id, mrs.relation_type_id;";

pub const DELETE_MINERAL_RELATION_SUGGESTION: &str =
    "DELETE FROM mineral_relation_suggestion AS mrs WHERE mrs.id IN \
     (SELECT old.id FROM (VALUES {values}) AS old (id, mineral_id)) \
     RETURNING mrs.id, mrs.mineral_id, mrs.relation_id, mrs.relation_type_id;";

pub const INSERT_MINERAL_CONTEXT: &str =
    "WITH ins (id, mineral_id, data, context_id) AS ( \
        INSERT INTO mineral_context AS mc (mineral_id, data, context_id) \
        SELECT ml.id, new.data::jsonb, dcl.id \
        FROM (VALUES {values}) AS new (name, data, context_id) \
        INNER JOIN mineral_log AS ml ON ml.name = new.name \
        INNER JOIN data_context_list AS dcl ON dcl.id = new.context_id \
        RETURNING mc.id, mc.mineral_id, mc.data, mc.context_id \
     ) \
     SELECT ml.name, ml.id AS mineral_id, ins.id, ins.data, dcl.name AS context \
     FROM ins \
     INNER JOIN mineral_log ml ON ml.id = ins.mineral_id \
     INNER JOIN data_context_list dcl ON dcl.id = ins.context_id;";

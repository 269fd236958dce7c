use super::*;

#[test]
fn compiles_flat_binary_operation_into_one_stage() {
    let pipeline = calc("{{calc.add({{data.a}};{{data.b}})}}", "total");
    assert_eq!(
        pipeline.into_documents(),
        vec![add_fields("data.total", json!({ "$add": ["$data.a", "$data.b"] }))]
    );
}

#[test]
fn non_commutative_operands_keep_their_order() {
    for (name, symbol) in [("sub", "$subtract"), ("div", "$divide")] {
        let pipeline = calc(&format!("{{{{calc.{name}(10;4)}}}}"), "x");
        assert_eq!(
            pipeline.stages()[0].expression(),
            &json!({ symbol: [10, 4] }),
            "{name}"
        );
    }
}

#[test]
fn nested_operation_is_materialized_before_its_consumer() {
    let pipeline = calc(
        "{{calc.sub({{calc.mul({{data.price}};{{data.qty}})}};{{data.discount}})}}",
        "net",
    );
    assert_eq!(
        pipeline.into_documents(),
        vec![
            add_fields(
                "aux.net-sub0",
                json!({ "$multiply": ["$data.price", "$data.qty"] })
            ),
            add_fields(
                "data.net",
                json!({ "$subtract": ["$aux.net-sub0", "$data.discount"] })
            ),
        ]
    );
}

#[test]
fn deep_nesting_orders_dependencies_depth_first() {
    let pipeline = calc(
        "{{calc.add({{calc.mul({{calc.sub({{data.a}};1)}};2)}};{{calc.div({{data.b}};4)}})}}",
        "x",
    );
    assert_eq!(
        stage_paths(&pipeline),
        vec!["aux.x-add0-mul1", "aux.x-add0", "aux.x-add2", "data.x"]
    );
    assert_eq!(
        pipeline.stages()[1].expression(),
        &json!({ "$multiply": ["$aux.x-add0-mul1", 2] })
    );
    assert_eq!(
        pipeline.stages()[3].expression(),
        &json!({ "$add": ["$aux.x-add0", "$aux.x-add2"] })
    );
}

#[test]
fn sibling_nested_operations_of_same_name_get_distinct_slots() {
    let pipeline = calc(
        "{{calc.add({{calc.mul(1;2)}};{{calc.mul(3;4)}})}}",
        "x",
    );
    assert_eq!(
        stage_paths(&pipeline),
        vec!["aux.x-add0", "aux.x-add1", "data.x"]
    );
}

#[test]
fn compiling_twice_is_identical() {
    let expr = "{{calc.if({{calc.gt({{data.score}};50)}};'pass';{{calc.concat('fail: ';{{data.score}})}})}}";
    assert_eq!(calc(expr, "grade"), calc(expr, "grade"));
}

#[test]
fn if_keeps_condition_then_else_positions() {
    let pipeline = calc(
        "{{calc.if({{calc.gte({{data.age}};18)}};'adult';'minor')}}",
        "group",
    );
    assert_eq!(
        pipeline.into_documents(),
        vec![
            add_fields("aux.group-if0", json!({ "$gte": ["$data.age", 18] })),
            add_fields(
                "data.group",
                json!({ "$cond": ["$aux.group-if0", "adult", "minor"] })
            ),
        ]
    );
}

#[test]
fn concat_coerces_only_dynamic_operands() {
    let pipeline = calc(
        "{{calc.concat({{data.first}};' ';{{info.createdAt}};2)}}",
        "label",
    );
    assert_eq!(
        pipeline.stages()[0].expression(),
        &json!({
            "$concat": [
                to_text("$data.first", "UTC"),
                " ",
                to_text("$createdAt", "UTC"),
                "2",
            ]
        })
    );
}

#[test]
fn concat_coerces_nested_results() {
    let opts = CompileOptions::with_timezone("Europe/Paris");
    let pipeline = build_calculated_field_pipeline_with_options(
        "{{calc.concat('day ';{{calc.day({{data.when}})}})}}",
        "label",
        &opts,
    )
    .expect("compile should succeed");
    assert_eq!(
        pipeline.into_documents(),
        vec![
            add_fields(
                "aux.label-concat0",
                json!({
                    "$dayOfMonth": {
                        "date": { "$toDate": "$data.when" },
                        "timezone": "Europe/Paris",
                    }
                })
            ),
            add_fields(
                "data.label",
                json!({ "$concat": ["day ", to_text("$aux.label-concat0", "Europe/Paris")] })
            ),
        ]
    );
}

#[test]
fn date_parts_use_the_supplied_timezone() {
    for (name, symbol) in [
        ("year", "$year"),
        ("month", "$month"),
        ("day", "$dayOfMonth"),
        ("hour", "$hour"),
        ("minute", "$minute"),
        ("second", "$second"),
        ("millisecond", "$millisecond"),
    ] {
        let pipeline = build_calculated_field_pipeline(
            &format!("{{{{calc.{name}({{{{info.modifiedAt}}}})}}}}"),
            "part",
            "America/New_York",
        )
        .expect("compile should succeed");
        assert_eq!(
            pipeline.stages()[0].expression(),
            &json!({
                symbol: {
                    "date": { "$toDate": "$modifiedAt" },
                    "timezone": "America/New_York",
                }
            }),
            "{name}"
        );
    }
}

#[test]
fn today_without_and_with_offset() {
    assert_eq!(
        calc("{{calc.today()}}", "now").stages()[0].expression(),
        &json!("$$NOW")
    );
    assert_eq!(
        calc("{{calc.today(5)}}", "due").stages()[0].expression(),
        &json!({ "$add": ["$$NOW", 432_000_000] })
    );
}

#[test]
fn today_with_dynamic_offset_multiplies_at_runtime() {
    assert_eq!(
        calc("{{calc.today({{data.delay}})}}", "due").stages()[0].expression(),
        &json!({ "$add": ["$$NOW", { "$multiply": ["$data.delay", 86_400_000] }] })
    );
}

#[test]
fn datediff_uses_configured_unit() {
    let opts = CompileOptions {
        date_diff_unit: DateUnit::Day,
        ..CompileOptions::default()
    };
    let pipeline = build_calculated_field_pipeline_with_options(
        "{{calc.datediff({{info.createdAt}};{{calc.today()}})}}",
        "age",
        &opts,
    )
    .expect("compile should succeed");
    assert_eq!(
        pipeline.into_documents(),
        vec![
            add_fields("aux.age-datediff0", json!("$$NOW")),
            add_fields(
                "data.age",
                json!({
                    "$dateDiff": {
                        "startDate": { "$toDate": "$createdAt" },
                        "endDate": { "$toDate": "$aux.age-datediff0" },
                        "unit": "day",
                        "timezone": "UTC",
                    }
                })
            ),
        ]
    );
}

#[test]
fn includes_is_false_for_non_arrays() {
    assert_eq!(
        calc("{{calc.includes({{data.tags}};'urgent')}}", "urgent").stages()[0].expression(),
        &json!({
            "$cond": {
                "if": { "$isArray": "$data.tags" },
                "then": { "$in": ["urgent", "$data.tags"] },
                "else": false,
            }
        })
    );
}

#[test]
fn size_treats_non_arrays_as_empty() {
    assert_eq!(
        calc("{{calc.size({{data.items}})}}", "count").stages()[0].expression(),
        &json!({
            "$size": {
                "$cond": {
                    "if": { "$isArray": "$data.items" },
                    "then": "$data.items",
                    "else": [],
                }
            }
        })
    );
}

#[test]
fn string_helpers_and_conversions() {
    assert_eq!(
        calc("{{calc.trim({{data.name}})}}", "t").stages()[0].expression(),
        &json!({ "$trim": { "input": "$data.name" } })
    );
    assert_eq!(
        calc("{{calc.length({{data.name}})}}", "n").stages()[0].expression(),
        &json!({ "$strLenCP": { "$toString": { "$ifNull": ["$data.name", ""] } } })
    );
    assert_eq!(
        calc("{{calc.toInt({{data.raw}})}}", "i").stages()[0].expression(),
        &json!({ "$toInt": "$data.raw" })
    );
    assert_eq!(
        calc("{{calc.toLong('42')}}", "l").stages()[0].expression(),
        &json!({ "$toLong": "42" })
    );
}

#[test]
fn dollar_prefixed_strings_stay_literal() {
    assert_eq!(
        calc("{{calc.eq({{data.currency}};'$USD')}}", "usd").stages()[0].expression(),
        &json!({ "$eq": ["$data.currency", { "$literal": "$USD" }] })
    );
}

#[test]
fn metadata_references_point_at_record_top_level() {
    assert_eq!(
        calc(
            "{{calc.and({{calc.exists({{info.modifiedAt}})}};{{calc.gt({{info.incrementalId}};0)}})}}",
            "ok"
        )
        .into_documents(),
        vec![
            add_fields(
                "aux.ok-and0",
                json!({ "$ne": [{ "$ifNull": ["$modifiedAt", null] }, null] })
            ),
            add_fields("aux.ok-and1", json!({ "$gt": ["$incrementalId", 0] })),
            add_fields("data.ok", json!({ "$and": ["$aux.ok-and0", "$aux.ok-and1"] })),
        ]
    );
}

#[test]
fn aux_rooted_target_is_kept() {
    let pipeline = calc("{{calc.add({{calc.mul(1;2)}};3)}}", "aux.tmp");
    assert_eq!(stage_paths(&pipeline), vec!["aux.tmp-add0", "aux.tmp"]);
    assert_eq!(
        pipeline.aux_paths().iter().map(|p| p.as_str()).collect::<Vec<_>>(),
        vec!["aux.tmp-add0", "aux.tmp"]
    );
}

#[test]
fn input_is_trimmed() {
    assert_eq!(
        calc("  {{calc.add(1;2)}}\n", "x"),
        calc("{{calc.add(1;2)}}", "x")
    );
}

#[test]
fn derived_dialect_matches_calc_output() {
    let derived = build_derived_field_pipeline(
        "@exp.sub(@exp.mul(@field.price;@field.qty);@const(5))",
        "net",
        "UTC",
    )
    .expect("derived compile should succeed");
    let calc = calc("{{calc.sub({{calc.mul({{data.price}};{{data.qty}})}};5)}}", "net");
    assert_eq!(derived, calc);
}

#[test]
fn derived_dialect_validates_arity_strictly() {
    let err = build_derived_field_pipeline("@exp.sub(@field.a)", "x", "UTC")
        .expect_err("arity should be checked");
    assert!(matches!(err, CompileError::Arity { ref name, actual: 1, .. } if name == "sub"));

    let err = build_derived_field_pipeline("@exp.if(@field.a;@const(1))", "x", "UTC")
        .expect_err("arity should be checked");
    assert!(matches!(err, CompileError::Arity { actual: 2, .. }));
}

#[test]
fn compile_errors_surface_synchronously() {
    assert!(matches!(
        build_calculated_field_pipeline("{{calc.frobnicate(1)}}", "x", "UTC"),
        Err(CompileError::UnknownOperation { .. })
    ));
    assert!(matches!(
        build_calculated_field_pipeline("{{calc.add(1)}}", "x", "UTC"),
        Err(CompileError::Arity { .. })
    ));
    assert!(matches!(
        build_calculated_field_pipeline("{{calc.add(1;two)}}", "x", "UTC"),
        Err(CompileError::Syntax { .. })
    ));
    assert!(matches!(
        build_calculated_field_pipeline("{{calc.add(1;2)", "x", "UTC"),
        Err(CompileError::Syntax { .. })
    ));
}

#[test]
fn nested_errors_are_not_swallowed() {
    let err = build_calculated_field_pipeline(
        "{{calc.add({{calc.mul({{calc.nope(1)}};2)}};1)}}",
        "x",
        "UTC",
    )
    .expect_err("nested unknown operation");
    assert_eq!(err.to_string(), "unknown operation `nope` in calc expressions");
}

#[test]
fn empty_target_field_is_rejected() {
    for field in ["", "  ", "data.", "aux."] {
        let err = build_calculated_field_pipeline("{{calc.add({{calc.mul(1;2)}};3)}}", field, "UTC")
            .expect_err("empty target should be rejected");
        assert!(matches!(err, CompileError::Syntax { .. }), "{field:?}");
    }
}

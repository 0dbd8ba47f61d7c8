//! Binding of the PAC helper vocabulary into a script context
//!
//! These are the only host capabilities a script can reach. Arguments are
//! converted leniently: a missing or non-string argument where a string is
//! expected is treated as the empty string.

use crate::clock::Clock;
use crate::helpers::{self, HostResolver, RangeArg};
use boa_engine::{Context, JsArgs, JsResult, JsString, JsValue, NativeFunction};
use std::sync::Arc;

/// Register every PAC global in `context`
pub(crate) fn register(
    context: &mut Context,
    clock: &Arc<dyn Clock>,
    resolver: &Arc<dyn HostResolver>,
) -> JsResult<()> {
    // Pure string predicates
    register_fn(
        context,
        "dnsDomainIs",
        2,
        NativeFunction::from_fn_ptr(|_this, args, _ctx| {
            let matched = helpers::dns_domain_is(&string_arg(args, 0), &string_arg(args, 1));
            Ok(JsValue::from(matched))
        }),
    )?;
    register_fn(
        context,
        "dnsDomainLevels",
        1,
        NativeFunction::from_fn_ptr(|_this, args, _ctx| {
            Ok(JsValue::from(helpers::dns_domain_levels(&string_arg(args, 0))))
        }),
    )?;
    register_fn(
        context,
        "isInNet",
        3,
        NativeFunction::from_fn_ptr(|_this, args, _ctx| {
            let in_net = helpers::is_in_net(
                &string_arg(args, 0),
                &string_arg(args, 1),
                &string_arg(args, 2),
            );
            Ok(JsValue::from(in_net))
        }),
    )?;
    register_fn(
        context,
        "isPlainHostName",
        1,
        NativeFunction::from_fn_ptr(|_this, args, _ctx| {
            Ok(JsValue::from(helpers::is_plain_host_name(&string_arg(args, 0))))
        }),
    )?;
    register_fn(
        context,
        "localHostOrDomainIs",
        2,
        NativeFunction::from_fn_ptr(|_this, args, _ctx| {
            let matched =
                helpers::local_host_or_domain_is(&string_arg(args, 0), &string_arg(args, 1));
            Ok(JsValue::from(matched))
        }),
    )?;
    register_fn(
        context,
        "shExpMatch",
        2,
        NativeFunction::from_fn_ptr(|_this, args, _ctx| {
            let matched = helpers::sh_exp_match(&string_arg(args, 0), &string_arg(args, 1));
            Ok(JsValue::from(matched))
        }),
    )?;
    register_fn(
        context,
        "alert",
        1,
        NativeFunction::from_fn_ptr(|_this, args, ctx| {
            let message = args.get_or_undefined(0).to_string(ctx)?;
            helpers::alert(&message.to_std_string_escaped());
            Ok(JsValue::undefined())
        }),
    )?;

    // Resolver-backed
    register_fn(
        context,
        "dnsResolve",
        1,
        with_resolver(resolver, |resolver, args| {
            js_string(&helpers::dns_resolve(resolver, &string_arg(args, 0)))
        }),
    )?;
    register_fn(
        context,
        "isResolvable",
        1,
        with_resolver(resolver, |resolver, args| {
            JsValue::from(helpers::is_resolvable(resolver, &string_arg(args, 0)))
        }),
    )?;
    register_fn(
        context,
        "myIpAddress",
        0,
        with_resolver(resolver, |resolver, _args| {
            js_string(&helpers::my_ip_address(resolver))
        }),
    )?;

    // Clock-backed
    register_fn(context, "weekdayRange", 3, with_clock(clock, helpers::weekday_range))?;
    register_fn(context, "dateRange", 7, with_clock(clock, helpers::date_range))?;
    register_fn(context, "timeRange", 7, with_clock(clock, helpers::time_range))?;

    Ok(())
}

fn register_fn(
    context: &mut Context,
    name: &str,
    length: usize,
    body: NativeFunction,
) -> JsResult<()> {
    context.register_global_callable(JsString::from(name), length, body)
}

fn with_resolver(
    resolver: &Arc<dyn HostResolver>,
    call: fn(&dyn HostResolver, &[JsValue]) -> JsValue,
) -> NativeFunction {
    let resolver = Arc::clone(resolver);
    // SAFETY: the closure captures an `Arc` to host state only, no GC-managed values
    unsafe { NativeFunction::from_closure(move |_this, args, _ctx| Ok(call(resolver.as_ref(), args))) }
}

fn with_clock(
    clock: &Arc<dyn Clock>,
    predicate: fn(&dyn Clock, &[RangeArg]) -> bool,
) -> NativeFunction {
    let clock = Arc::clone(clock);
    // SAFETY: the closure captures an `Arc` to host state only, no GC-managed values
    unsafe {
        NativeFunction::from_closure(move |_this, args, _ctx| {
            let args: Vec<RangeArg> = args.iter().map(range_arg).collect();
            Ok(JsValue::from(predicate(clock.as_ref(), &args)))
        })
    }
}

fn string_arg(args: &[JsValue], index: usize) -> String {
    args.get_or_undefined(index)
        .as_string()
        .map(JsString::to_std_string_escaped)
        .unwrap_or_default()
}

fn js_string(s: &str) -> JsValue {
    JsValue::from(JsString::from(s))
}

fn range_arg(value: &JsValue) -> RangeArg {
    if let Some(n) = value.as_number() {
        if n.is_finite() {
            return RangeArg::Number(n.trunc() as i64);
        }
        return RangeArg::Other;
    }
    match value.as_string() {
        Some(s) => RangeArg::Text(s.to_std_string_escaped()),
        None => RangeArg::Other,
    }
}

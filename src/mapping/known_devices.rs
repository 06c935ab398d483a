//! Eingebaute Layouts für Controller, deren Rohlayout von der
//! Standardreihenfolge abweicht. Zuordnung über kleingeschriebene Namensfragmente.

use super::MappingEntry;

const KNOWN_DEVICES: &[(&str, &str, &str)] = &[
    (
        "8bitdo",
        "8BitDo (DirectInput)",
        "a:b1,b:b0,x:b4,y:b3,leftshoulder:b6,rightshoulder:b7,lefttrigger:b8,righttrigger:b9,\
         back:b10,start:b11,leftstick:b13,rightstick:b14,\
         dpup:-a7,dpdown:+a7,dpleft:-a6,dpright:+a6,\
         leftx:a0,lefty:a1,rightx:a2,righty:a3",
    ),
    (
        "xbox",
        "Xbox (XInput)",
        "a:b0,b:b1,x:b2,y:b3,leftshoulder:b4,rightshoulder:b5,lefttrigger:a2,righttrigger:a5,\
         back:b6,start:b7,leftstick:b9,rightstick:b10,\
         dpup:-a7,dpdown:+a7,dpleft:-a6,dpright:+a6,\
         leftx:a0,lefty:a1,rightx:a3,righty:a4",
    ),
    (
        "dualshock",
        "DualShock 4",
        "a:b1,b:b2,x:b0,y:b3,leftshoulder:b4,rightshoulder:b5,lefttrigger:+a3,righttrigger:+a4,\
         back:b8,start:b9,leftstick:b10,rightstick:b11,\
         dpup:-a7,dpdown:+a7,dpleft:-a6,dpright:+a6,\
         leftx:a0,lefty:a1,rightx:a2,righty:a5",
    ),
    (
        "wireless controller",
        "Sony Wireless Controller",
        "a:b1,b:b2,x:b0,y:b3,leftshoulder:b4,rightshoulder:b5,lefttrigger:+a3,righttrigger:+a4,\
         back:b8,start:b9,leftstick:b10,rightstick:b11,\
         dpup:-a7,dpdown:+a7,dpleft:-a6,dpright:+a6,\
         leftx:a0,lefty:a1,rightx:a2,righty:a5",
    ),
    (
        "pro controller",
        "Switch Pro Controller",
        "a:b1,b:b0,x:b3,y:b2,leftshoulder:b4,rightshoulder:b5,lefttrigger:b6,righttrigger:b7,\
         back:b8,start:b9,leftstick:b10,rightstick:b11,\
         dpup:b12,dpdown:b13,dpleft:b14,dpright:b15,\
         leftx:a0,lefty:a1,rightx:a2,righty:a3",
    ),
];

/// Parst die eingebaute Tabelle. Das erste passende Fragment gewinnt, daher
/// steht "xbox" vor dem generischen Sony-Fragment "wireless controller".
pub fn builtin() -> Vec<(&'static str, MappingEntry)> {
    KNOWN_DEVICES
        .iter()
        .map(|(fragment, name, definition)| {
            (
                *fragment,
                MappingEntry::parse(format!("builtin:{}", fragment), *name, definition),
            )
        })
        .collect()
}

#![allow(dead_code)]

use std::path::Path;

pub fn write(root: &Path, rel: &str, content: &str) {
    let p = root.join(rel);
    std::fs::create_dir_all(p.parent().unwrap()).unwrap();
    std::fs::write(p, content).unwrap();
}

pub const USER_CONTROLLER: &str = r#"package com.acme.users;

import java.io.IOException;
import org.springframework.web.bind.annotation.*;

@RestController
@RequestMapping("/users")
public class UserController {
    private final UserService userService;

    public UserController(UserService userService) {
        this.userService = userService;
    }

    @GetMapping("/{id}")
    public UserDto getUser(@PathVariable("id") Long id) {
        return userService.find(id);
    }

    @PostMapping
    public UserDto create(@RequestBody UserDto body) throws IOException {
        return userService.save(body);
    }
}
"#;

pub const USER_SERVICE: &str = r#"package com.acme.users;

import org.springframework.stereotype.Service;

@Service
public class UserService {
    public UserDto find(Long id) {
        return null;
    }

    public UserDto save(UserDto dto) {
        return dto;
    }
}
"#;

pub const USER_DTO: &str = "package com.acme.users;\n\npublic record UserDto(Long id, String name) {}\n";

pub const PACKAGE_JSON: &str = r#"{
  "name": "users-api",
  "dependencies": { "@nestjs/core": "^10.0.0", "@nestjs/common": "^10.0.0" },
  "devDependencies": { "typescript": "^5.4.0" }
}"#;

pub const NEST_CONTROLLER: &str = r#"import { Controller, Get, Post, Body, Param } from '@nestjs/common';
import { UsersService } from './users.service';
import { CreateUserDto } from './dto/create-user.dto';

@Controller('users')
export class UsersController {
  constructor(private readonly usersService: UsersService) {}

  @Get(':id')
  findOne(@Param('id') id: string) {
    return this.usersService.findOne(id);
  }

  @Post()
  create(@Body() dto: CreateUserDto) {
    return this.usersService.create(dto);
  }
}
"#;

pub const NEST_SERVICE: &str = r#"import { Injectable } from '@nestjs/common';
import { CreateUserDto } from './dto/create-user.dto';

@Injectable()
export class UsersService {
  create(dto: CreateUserDto) {
    return dto;
  }

  findOne(id: string) {
    return { id };
  }
}
"#;

pub const NEST_DTO: &str = "export class CreateUserDto {\n  name: string;\n}\n";

pub const NEST_MAIN: &str = r#"import { NestFactory } from '@nestjs/core';
import { AppModule } from './app.module';

async function bootstrap() {
  const app = await NestFactory.create(AppModule);
  await app.listen(3000);
}
bootstrap();
"#;

pub const GO_DOCUMENT: &str = r#"{
  "module": "example.com/shop",
  "packages": [
    {
      "path": "example.com/shop/internal/orders",
      "name": "orders",
      "dir": "internal/orders",
      "files": ["handler.go"],
      "imports": ["net/http"],
      "structs": [
        { "name": "OrderHandler", "file": "handler.go", "line": 9, "fields": [{ "name": "store", "type": "*OrderStore" }] },
        { "name": "OrderStore", "file": "store.go", "line": 5 }
      ],
      "functions": [
        {
          "name": "Create", "receiver": "*OrderHandler", "file": "handler.go", "line": 14,
          "params": [{ "name": "w", "type": "http.ResponseWriter" }],
          "http_method": "POST", "http_path": "/orders"
        }
      ]
    }
  ]
}"#;

/// Java (Spring), TypeScript (Nest) and Go (precomputed analyzer document) side by side.
pub fn polyglot_fixture(root: &Path) {
    write(root, "pom.xml", "<project/>");
    write(root, "src/main/java/com/acme/users/UserController.java", USER_CONTROLLER);
    write(root, "src/main/java/com/acme/users/UserService.java", USER_SERVICE);
    write(root, "src/main/java/com/acme/users/UserDto.java", USER_DTO);

    write(root, "package.json", PACKAGE_JSON);
    write(root, "src/users/users.controller.ts", NEST_CONTROLLER);
    write(root, "src/users/users.service.ts", NEST_SERVICE);
    write(root, "src/users/dto/create-user.dto.ts", NEST_DTO);
    write(root, "src/main.ts", NEST_MAIN);

    write(root, "go.mod", "module example.com/shop\n\ngo 1.22\n");
    write(root, "go-analysis.json", GO_DOCUMENT);
    write(root, ".archgraph.json", r#"{ "go": { "document": "go-analysis.json" } }"#);
}
